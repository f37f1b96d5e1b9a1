//! Core types for LLM interaction.
//!
//! These types are provider-agnostic; the [`super::client`] module
//! translates them into the Gemini wire format.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default sampling temperature.  Extraction favours determinism.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Default output-token budget per completion.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1500;

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// A single completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier.  Empty means "not yet routed"; the model chain
    /// fills it in before dispatch.
    #[serde(default)]
    pub model: String,

    /// The full prompt text.
    pub prompt: String,

    /// Sampling temperature.
    pub temperature: f32,

    /// Maximum number of tokens the backend may generate.
    pub max_output_tokens: u32,

    /// Response MIME type hint (e.g. `application/json`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

impl CompletionRequest {
    /// Build a request that asks the backend for JSON output.
    pub fn json(prompt: impl Into<String>) -> Self {
        Self {
            model: String::new(),
            prompt: prompt.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            response_mime_type: Some("application/json".into()),
        }
    }

    /// Override the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Override the output-token budget.
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// Return a copy of this request routed to `model`.
    pub fn for_model(&self, model: &str) -> Self {
        Self {
            model: model.to_owned(),
            ..self.clone()
        }
    }
}

/// The raw text produced by a successful completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// The model that produced the text.
    pub model: String,
    /// The raw completion text, exactly as returned.
    pub text: String,
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// A generative text backend.
///
/// Implementations perform exactly one network attempt per call.  Retry and
/// model switching are layered on top by [`super::RetryPolicy`] and
/// [`super::ModelChain`].
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Short provider name used in logs and errors.
    fn provider(&self) -> &str;

    /// Send `request` and return the completion text.
    ///
    /// A non-success HTTP status must be reported as
    /// [`crate::AgentError::Backend`]; a failure to reach the backend at all
    /// as [`crate::AgentError::LlmRequestFailed`].
    async fn generate(&self, request: &CompletionRequest) -> Result<String>;
}
