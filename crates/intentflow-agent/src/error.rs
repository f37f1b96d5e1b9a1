//! Agent error types.
//!
//! All completion failures surface through [`AgentError`].  The retry and
//! model-selection policies inspect the variant (and the HTTP status where
//! one exists) to decide whether to try again, switch models, or give up.

/// Unified error type for the completion layer.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    // -- Configuration errors ------------------------------------------------
    /// The API key is missing for a provider that requires one.
    #[error("missing api key for provider: {provider}")]
    MissingApiKey { provider: String },

    /// No candidate model was configured.
    #[error("no model configured for provider: {provider}")]
    NoModelConfigured { provider: String },

    /// Configuration validation failed.
    #[error("config error: {reason}")]
    ConfigError { reason: String },

    // -- LLM errors ----------------------------------------------------------
    /// The request never produced an HTTP response (connect, DNS, timeout).
    #[error("llm request failed: {reason}")]
    LlmRequestFailed { reason: String },

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    /// The response body could not be parsed into the expected format.
    #[error("llm response parse error: {reason}")]
    LlmParseFailed { reason: String },

    // -- Generic -------------------------------------------------------------
    /// Catch-all for unexpected internal errors.  Prefer a typed variant
    /// whenever possible.
    #[error("internal agent error: {0}")]
    Internal(String),
}

impl AgentError {
    /// The HTTP status carried by this error, if the backend produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the same request may succeed if sent again after a delay.
    ///
    /// Rate limiting (429) and network-level failures qualify; everything
    /// else is deterministic for a given model.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::LlmRequestFailed { .. } => true,
            Self::Backend { status, .. } => *status == 429,
            _ => false,
        }
    }

    /// A message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingApiKey { .. } => "AI API key not configured".to_owned(),
            Self::Backend { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Convenience alias used throughout the agent crate.
pub type Result<T> = std::result::Result<T, AgentError>;

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        Self::LlmRequestFailed {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_retryable() {
        let err = AgentError::Backend {
            status: 429,
            message: "quota".into(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.status(), Some(429));
    }

    #[test]
    fn not_found_is_not_retryable() {
        let err = AgentError::Backend {
            status: 404,
            message: "no such model".into(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn network_failure_is_retryable() {
        let err = AgentError::LlmRequestFailed {
            reason: "connection reset".into(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn missing_key_user_message() {
        let err = AgentError::MissingApiKey {
            provider: "gemini".into(),
        };
        assert_eq!(err.user_message(), "AI API key not configured");
    }
}
