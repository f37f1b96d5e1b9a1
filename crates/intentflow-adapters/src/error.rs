//! Adapter error types.
//!
//! All adapter subsystems surface errors through [`AdapterError`].  Each
//! variant carries enough context for callers to decide how to handle the
//! failure without inspecting opaque strings.

/// Unified error type for IntentFlow adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The HTTP request could not be completed.
    #[error("http request failed: {reason}")]
    Http { reason: String },

    /// The upstream service answered with a non-success status.
    #[error("upstream returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    /// The upstream payload did not have the expected shape.
    #[error("invalid payload: {reason}")]
    InvalidPayload { reason: String },

    /// An unknown query action was requested.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation exceeded its time limit.
    #[error("timeout after {seconds}s: {reason}")]
    Timeout { seconds: u64, reason: String },

    /// Configuration error in adapter setup.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl AdapterError {
    /// The upstream HTTP status, if the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UpstreamStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the adapters crate.
pub type Result<T> = std::result::Result<T, AdapterError>;

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http {
            reason: err.to_string(),
        }
    }
}
