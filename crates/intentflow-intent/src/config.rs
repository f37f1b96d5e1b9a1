//! Pipeline configuration.
//!
//! Loaded from a TOML file (sections `[ai]`, `[retry]`, `[market]`), then
//! overridden from the environment.  Every field has a default, so an empty
//! or missing file is a valid configuration.

use std::path::Path;
use std::time::Duration;

use intentflow_adapters::CoinCapConfig;
use intentflow_adapters::coincap::COINCAP_BASE_URL;
use intentflow_agent::llm::client::GEMINI_BASE_URL;
use intentflow_agent::llm::router::{GEMINI_FLASH, GEMINI_PRO};
use intentflow_agent::llm::types::{DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE};
use intentflow_agent::{GeminiClientConfig, ModelChain, RetryPolicy};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::enrich::{DEFAULT_MAX_ENTRIES, DEFAULT_SYMBOLS};
use crate::error::{IntentError, Result};

/// Default location of the configuration file, relative to the working
/// directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// `[ai]`: the generative backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// API key.  Usually supplied through the environment instead.
    pub api_key: Option<String>,
    pub base_url: String,
    pub primary_model: String,
    /// Model tried once the primary is unavailable.  Blank disables it.
    pub fallback_model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: GEMINI_BASE_URL.to_owned(),
            primary_model: GEMINI_FLASH.to_owned(),
            fallback_model: GEMINI_PRO.to_owned(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            timeout_secs: 30,
        }
    }
}

impl AiSettings {
    /// The configured key, if it is non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

/// `[retry]`: per-model backoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            initial_delay_ms: policy.initial_delay.as_millis() as u64,
            backoff_factor: policy.backoff_factor,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}

/// `[market]`: prompt enrichment and the price proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSettings {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub symbols: Vec<String>,
    pub max_entries: usize,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: COINCAP_BASE_URL.to_owned(),
            api_key: None,
            timeout_secs: 5,
            cache_ttl_secs: 30,
            symbols: DEFAULT_SYMBOLS.iter().map(|s| (*s).to_owned()).collect(),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Complete configuration of an [`IntentPipeline`](crate::IntentPipeline).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub ai: AiSettings,
    pub retry: RetrySettings,
    pub market: MarketSettings,
}

impl PipelineConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| IntentError::ConfigError {
            reason: format!("failed to parse TOML config: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "configuration file does not exist, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "configuration loaded from file");
        Ok(config)
    }

    /// Reject values that cannot work at all.
    pub fn validate(&self) -> Result<()> {
        if self.ai.primary_model.trim().is_empty() {
            return Err(IntentError::ConfigError {
                reason: "ai.primary_model must not be empty".into(),
            });
        }
        if !(0.0..=2.0).contains(&self.ai.temperature) {
            return Err(IntentError::ConfigError {
                reason: format!("ai.temperature {} is outside 0.0..=2.0", self.ai.temperature),
            });
        }
        if self.ai.max_output_tokens == 0 {
            return Err(IntentError::ConfigError {
                reason: "ai.max_output_tokens must be positive".into(),
            });
        }
        if !self.retry.backoff_factor.is_finite() || self.retry.backoff_factor < 1.0 {
            return Err(IntentError::ConfigError {
                reason: format!(
                    "retry.backoff_factor {} must be a finite number of at least 1.0",
                    self.retry.backoff_factor
                ),
            });
        }
        Ok(())
    }

    /// Apply environment overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply environment-style overrides from an arbitrary lookup.
    ///
    /// Blank values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("INTENTFLOW_AI_API_KEY").or_else(|| get("GEMINI_API_KEY")) {
            self.ai.api_key = Some(key);
        }
        if let Some(url) = get("INTENTFLOW_AI_BASE_URL") {
            self.ai.base_url = url;
        }
        if let Some(model) = get("INTENTFLOW_PRIMARY_MODEL") {
            self.ai.primary_model = model;
        }
        if let Some(model) = get("INTENTFLOW_FALLBACK_MODEL") {
            self.ai.fallback_model = model;
        }
        if let Some(flag) = get("INTENTFLOW_MARKET_ENABLED") {
            match parse_flag(&flag) {
                Some(enabled) => self.market.enabled = enabled,
                None => warn!(value = %flag, "ignoring unparseable INTENTFLOW_MARKET_ENABLED"),
            }
        }
        if let Some(key) = get("COINCAP_API_KEY") {
            self.market.api_key = Some(key);
        }
        if let Some(url) = get("INTENTFLOW_COINCAP_URL") {
            self.market.base_url = url;
        }

        debug!(
            ai_key_set = self.ai.api_key().is_some(),
            primary = %self.ai.primary_model,
            market = self.market.enabled,
            "environment overrides applied"
        );
    }

    // -- Derived values ------------------------------------------------------

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            backoff_factor: self.retry.backoff_factor,
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    pub fn model_chain(&self) -> ModelChain {
        ModelChain::new([self.ai.primary_model.clone(), self.ai.fallback_model.clone()])
    }

    /// Client settings, or `None` when no API key is configured.
    pub fn gemini_config(&self) -> Option<GeminiClientConfig> {
        let key = self.ai.api_key()?;
        Some(
            GeminiClientConfig::new(key)
                .with_base_url(self.ai.base_url.clone())
                .with_timeout(Duration::from_secs(self.ai.timeout_secs)),
        )
    }

    pub fn coincap_config(&self) -> CoinCapConfig {
        CoinCapConfig {
            base_url: self.market.base_url.clone(),
            api_key: self
                .market
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty()),
            timeout: Duration::from_secs(self.market.timeout_secs),
            cache_ttl: Duration::from_secs(self.market.cache_ttl_secs),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_behaviour() {
        let config = PipelineConfig::default();
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.model_chain().models(), [GEMINI_FLASH, GEMINI_PRO]);
        assert!(config.gemini_config().is_none());
        assert!(config.market.enabled);
        assert_eq!(config.market.max_entries, 5);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [ai]
            primary_model = "gemini-test"
            fallback_model = ""

            [retry]
            max_retries = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.model_chain().models(), ["gemini-test"]);
        assert_eq!(config.retry_policy().max_attempts(), 1);
        assert_eq!(config.ai.max_output_tokens, DEFAULT_MAX_OUTPUT_TOKENS);
        assert_eq!(config.market, MarketSettings::default());
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = PipelineConfig::from_toml_str("[ai\nprimary_model = 3").unwrap_err();
        assert!(matches!(err, IntentError::ConfigError { .. }));
    }

    #[test]
    fn validation_rejects_non_finite_backoff() {
        for value in ["nan", "inf", "0.5"] {
            let err = PipelineConfig::from_toml_str(&format!("[retry]\nbackoff_factor = {value}"))
                .unwrap_err();
            assert!(err.to_string().contains("backoff_factor"), "{value}: {err}");
        }
    }

    #[test]
    fn validation_rejects_blank_primary_model() {
        let err = PipelineConfig::from_toml_str("[ai]\nprimary_model = \" \"").unwrap_err();
        assert!(err.to_string().contains("primary_model"));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[market]\nenabled = false\nmax_entries = 3").unwrap();

        let config = PipelineConfig::load(file.path()).unwrap();
        assert!(!config.market.enabled);
        assert_eq!(config.market.max_entries, 3);
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn env_overrides_take_precedence() {
        let mut config = PipelineConfig::default();
        config.apply_overrides_from(env(&[
            ("GEMINI_API_KEY", "AIza-test"),
            ("INTENTFLOW_PRIMARY_MODEL", "gemini-x"),
            ("INTENTFLOW_MARKET_ENABLED", "off"),
            ("INTENTFLOW_COINCAP_URL", "http://127.0.0.1:9/v2"),
            ("COINCAP_API_KEY", "cc"),
        ]));

        assert_eq!(config.ai.api_key(), Some("AIza-test"));
        assert_eq!(config.model_chain().models(), ["gemini-x", GEMINI_PRO]);
        assert!(!config.market.enabled);

        let coincap = config.coincap_config();
        assert_eq!(coincap.base_url, "http://127.0.0.1:9/v2");
        assert_eq!(coincap.api_key.as_deref(), Some("cc"));
    }

    #[test]
    fn intentflow_key_wins_over_gemini_key() {
        let mut config = PipelineConfig::default();
        config.apply_overrides_from(env(&[
            ("INTENTFLOW_AI_API_KEY", "primary"),
            ("GEMINI_API_KEY", "secondary"),
        ]));
        assert_eq!(config.ai.api_key(), Some("primary"));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = PipelineConfig::default();
        config.apply_overrides_from(env(&[
            ("INTENTFLOW_AI_API_KEY", "  "),
            ("INTENTFLOW_MARKET_ENABLED", "maybe"),
        ]));
        assert!(config.gemini_config().is_none());
        assert!(config.market.enabled);
    }
}
