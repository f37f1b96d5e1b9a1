//! The intent pipeline orchestrator.
//!
//! ```text
//! START -> ENRICH -> AI_CALL -> EXTRACT -> NORMALIZE -> COMPILE -> DONE
//!                       \           \
//!                        +-----------+--> FALLBACK -> COMPILE -> DONE
//! ```
//!
//! [`IntentPipeline::parse_intent`] never fails.  Every failure on the AI
//! path becomes a diagnostic on the outcome and the lexical parser takes
//! over.  Only input validation ([`IntentPipeline::parse`]) can reject a
//! request.

use std::sync::Arc;
use std::time::Duration;

use intentflow_adapters::{CoinCapAdapter, PriceFeed};
use intentflow_agent::llm::types::{DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE};
use intentflow_agent::{
    AgentError, CompletionBackend, CompletionRequest, GeminiClient, ModelChain, RetryPolicy,
    complete_with_fallback,
};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::enrich::MarketContext;
use crate::error::{IntentError, Result};
use crate::extract::extract;
use crate::fallback::LexicalParser;
use crate::prompt::{self, SYSTEM_PROMPT};
use crate::rules::content_digest;
use crate::types::ParsedIntent;

/// Diagnostic attached when no AI backend is configured.
pub const MISSING_KEY_DIAGNOSTIC: &str = "AI API key not configured";

/// Diagnostic attached when the AI answered but nothing usable was found.
pub const EXTRACTION_DIAGNOSTIC: &str = "Failed to parse AI response. Using fallback parser.";

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// The result of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub intent: ParsedIntent,
    /// Human-readable reason for falling back, when the AI path was not used.
    pub diagnostic: Option<String>,
    /// The model that produced the AI result.
    pub model: Option<String>,
}

impl ParseOutcome {
    pub fn used_fallback(&self) -> bool {
        self.intent.used_fallback
    }

    /// SHA-256 digest of the compiled execution rules.
    pub fn rules_digest(&self) -> String {
        content_digest(&self.intent.execution_rules)
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Turns raw intent text into a [`ParsedIntent`].
///
/// Stateless between calls; share it behind an `Arc`.
pub struct IntentPipeline {
    backend: Option<Arc<dyn CompletionBackend>>,
    market: Option<MarketContext>,
    retry: RetryPolicy,
    models: ModelChain,
    temperature: f32,
    max_output_tokens: u32,
    lexical: LexicalParser,
}

impl std::fmt::Debug for IntentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentPipeline")
            .field("backend", &self.backend.as_ref().map(|b| b.provider().to_owned()))
            .field("market", &self.market)
            .field("retry", &self.retry)
            .field("models", &self.models)
            .finish_non_exhaustive()
    }
}

impl Default for IntentPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentPipeline {
    /// A pipeline with no backend and no market context: every request takes
    /// the fallback path.
    pub fn new() -> Self {
        Self {
            backend: None,
            market: None,
            retry: RetryPolicy::default(),
            models: ModelChain::default(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            lexical: LexicalParser::default(),
        }
    }

    /// Build a pipeline from configuration, creating the Gemini client and
    /// the CoinCap feed it describes.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let feed: Option<Arc<dyn PriceFeed>> = if config.market.enabled {
            Some(Arc::new(CoinCapAdapter::new(config.coincap_config())?) as Arc<dyn PriceFeed>)
        } else {
            None
        };
        Self::from_parts(config, None, feed)
    }

    /// Build a pipeline from configuration with caller-supplied collaborators.
    ///
    /// When `backend` is `None` a Gemini client is created if an API key is
    /// configured.  `feed` is only used when market enrichment is enabled.
    pub fn from_parts(
        config: &PipelineConfig,
        backend: Option<Arc<dyn CompletionBackend>>,
        feed: Option<Arc<dyn PriceFeed>>,
    ) -> Result<Self> {
        config.validate()?;

        let backend = match backend {
            Some(b) => Some(b),
            None => match config.gemini_config() {
                Some(gemini) => Some(Arc::new(GeminiClient::new(gemini)?) as Arc<dyn CompletionBackend>),
                None => {
                    warn!("no AI API key configured, every intent will use the fallback parser");
                    None
                }
            },
        };

        let market = feed.filter(|_| config.market.enabled).map(|feed| {
            MarketContext::new(feed)
                .with_symbols(config.market.symbols.clone())
                .with_max_entries(config.market.max_entries)
                .with_timeout(Duration::from_secs(config.market.timeout_secs))
        });

        info!(
            backend = backend.as_ref().map(|b| b.provider()),
            models = ?config.model_chain().models(),
            market = market.is_some(),
            "intent pipeline ready"
        );

        Ok(Self {
            backend,
            market,
            retry: config.retry_policy(),
            models: config.model_chain(),
            temperature: config.ai.temperature,
            max_output_tokens: config.ai.max_output_tokens,
            lexical: LexicalParser::default(),
        })
    }

    // -- Builders ------------------------------------------------------------

    pub fn with_backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_market(mut self, market: MarketContext) -> Self {
        self.market = Some(market);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_models(mut self, models: ModelChain) -> Self {
        self.models = models;
        self
    }

    pub fn with_generation(mut self, temperature: f32, max_output_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_output_tokens = max_output_tokens;
        self
    }

    // -- Accessors -----------------------------------------------------------

    /// Whether an AI backend is configured.
    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Whether prompts are enriched with market prices.
    pub fn has_market_context(&self) -> bool {
        self.market.is_some()
    }

    pub fn models(&self) -> &ModelChain {
        &self.models
    }

    // -- Entry points --------------------------------------------------------

    /// Reject empty or whitespace-only intent text.
    pub fn validate_input(text: &str) -> Result<&str> {
        if text.trim().is_empty() {
            return Err(IntentError::EmptyInput);
        }
        Ok(text)
    }

    /// Validate `text`, then run the pipeline.
    pub async fn parse(&self, text: &str) -> Result<ParseOutcome> {
        let text = Self::validate_input(text)?;
        Ok(self.parse_intent(text).await)
    }

    /// Run the pipeline.  Never fails: any AI-path failure yields a fallback
    /// result with a diagnostic.
    pub async fn parse_intent(&self, text: &str) -> ParseOutcome {
        let mut outcome = match self.ai_path(text).await {
            Ok((intent, model)) => {
                info!(model = %model, actions = intent.actions.len(), "intent parsed via AI");
                ParseOutcome {
                    intent,
                    diagnostic: None,
                    model: Some(model),
                }
            }
            Err(e) => {
                let diagnostic = diagnostic_for(&e);
                warn!(error = %e, diagnostic = %diagnostic, "AI path failed, using fallback parser");
                ParseOutcome {
                    intent: self.lexical.parse(text),
                    diagnostic: Some(diagnostic),
                    model: None,
                }
            }
        };
        outcome.intent.ensure_invariants();
        outcome
    }

    /// ENRICH -> AI_CALL -> EXTRACT -> NORMALIZE -> COMPILE.
    async fn ai_path(&self, text: &str) -> Result<(ParsedIntent, String)> {
        let backend = self.backend.as_ref().ok_or_else(|| AgentError::MissingApiKey {
            provider: "gemini".into(),
        })?;

        let system = match &self.market {
            Some(market) => market.enrich(SYSTEM_PROMPT).await,
            None => SYSTEM_PROMPT.to_owned(),
        };

        let request = CompletionRequest::json(prompt::assemble(&system, text))
            .with_temperature(self.temperature)
            .with_max_output_tokens(self.max_output_tokens);

        let completion =
            complete_with_fallback(backend.as_ref(), &self.retry, &self.models, &request).await?;
        debug!(model = %completion.model, len = completion.text.len(), "extracting AI response");

        let fields = extract(&completion.text)?;
        Ok((ParsedIntent::new(text, fields, false), completion.model))
    }
}

/// The user-facing reason for a fallback.
fn diagnostic_for(error: &IntentError) -> String {
    match error {
        IntentError::Agent(agent) => agent.user_message(),
        IntentError::ExtractionFailed { .. } | IntentError::MissingActions => {
            EXTRACTION_DIAGNOSTIC.to_owned()
        }
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
