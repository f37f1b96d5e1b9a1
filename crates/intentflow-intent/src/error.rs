//! Intent engine error types.
//!
//! All intent subsystems surface errors through [`IntentError`].  Inside the
//! pipeline every one of these becomes a routing decision; only
//! [`IntentError::EmptyInput`] is meant to reach a caller.

/// Unified error type for the intent engine.
#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    // -- Input errors --------------------------------------------------------
    /// The intent text was empty or whitespace.
    #[error("Invalid input. Please provide a valid intent description.")]
    EmptyInput,

    // -- Extraction errors ---------------------------------------------------
    /// No extraction strategy produced a JSON object.
    #[error("failed to extract JSON from AI response: {reason}")]
    ExtractionFailed { reason: String },

    /// A JSON object was found but it has no usable `actions` list.
    #[error("invalid response: missing actions array")]
    MissingActions,

    // -- Configuration -------------------------------------------------------
    /// Configuration loading or validation failed.
    #[error("config error: {reason}")]
    ConfigError { reason: String },

    // -- Upstream crate errors -----------------------------------------------
    /// An error propagated from the agent crate.
    #[error("agent error: {0}")]
    Agent(#[from] intentflow_agent::AgentError),

    /// An error propagated from the adapters crate.
    #[error("adapter error: {0}")]
    Adapter(#[from] intentflow_adapters::AdapterError),

    // -- I/O -----------------------------------------------------------------
    /// I/O failure while reading configuration.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the intent crate.
pub type Result<T> = std::result::Result<T, IntentError>;
