//! Model chain.
//!
//! An ordered list of candidate models: the first is the fast, cheap
//! default and later entries are more capable fallbacks.  The chain only
//! moves on when the failure says the *model* is the problem (rate-limited,
//! forbidden, or missing); other failures end the call.

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::llm::retry::RetryPolicy;
use crate::llm::types::{Completion, CompletionBackend, CompletionRequest};

/// Fast default Gemini model.
pub const GEMINI_FLASH: &str = "gemini-2.5-flash";

/// More capable Gemini model used when the fast one is unavailable.
pub const GEMINI_PRO: &str = "gemini-2.5-pro";

/// HTTP statuses that justify trying the next model in the chain.
const MODEL_SWITCH_STATUSES: [u16; 3] = [429, 403, 404];

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Ordered candidate models, primary first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelChain {
    models: Vec<String>,
}

impl Default for ModelChain {
    fn default() -> Self {
        Self::new([GEMINI_FLASH, GEMINI_PRO])
    }
}

impl ModelChain {
    /// Create a chain from the given models, in priority order.  Blank
    /// entries are dropped.
    pub fn new<I, S>(models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            models: models
                .into_iter()
                .map(Into::into)
                .filter(|m: &String| !m.trim().is_empty())
                .collect(),
        }
    }

    /// A chain with a single model and no fallback.
    pub fn single(model: impl Into<String>) -> Self {
        Self::new([model.into()])
    }

    /// The candidate models, primary first.
    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Whether `error` warrants moving on to the next model.
    pub fn should_switch(&self, error: &AgentError) -> bool {
        error
            .status()
            .is_some_and(|status| MODEL_SWITCH_STATUSES.contains(&status))
    }
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Ask `backend` for a completion, walking `chain` and applying `retry` to
/// each model.
///
/// Returns the first successful completion, or the error that ended the walk:
/// a non-switchable failure, or the last model's failure once the chain is
/// exhausted.
pub async fn complete_with_fallback(
    backend: &dyn CompletionBackend,
    retry: &RetryPolicy,
    chain: &ModelChain,
    template: &CompletionRequest,
) -> Result<Completion> {
    let models = chain.models();
    let mut last_error: Option<AgentError> = None;

    for (index, model) in models.iter().enumerate() {
        let request = template.for_model(model);
        let request_ref = &request;

        tracing::debug!(
            provider = backend.provider(),
            model = %model,
            position = index,
            "dispatching completion"
        );

        match retry
            .run(model, move |_| backend.generate(request_ref))
            .await
        {
            Ok(text) => {
                tracing::info!(
                    provider = backend.provider(),
                    model = %model,
                    response_len = text.len(),
                    "completion received"
                );
                return Ok(Completion {
                    model: model.clone(),
                    text,
                });
            }
            Err(e) if chain.should_switch(&e) && index + 1 < models.len() => {
                tracing::warn!(
                    model = %model,
                    next = %models[index + 1],
                    error = %e,
                    "model unavailable, switching to fallback model"
                );
                last_error = Some(e);
            }
            Err(e) => {
                tracing::warn!(model = %model, error = %e, "completion failed");
                return Err(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| AgentError::NoModelConfigured {
        provider: backend.provider().to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
