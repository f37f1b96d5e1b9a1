//! Shared helper functions used across CLI subcommands.

use std::path::Path;

use anyhow::{Context, Result};
use intentflow_intent::PipelineConfig;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber with the given default log level.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Load the pipeline configuration from `path` and apply environment
/// overrides (including anything `.env` put there).
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    config.apply_env_overrides();
    config
        .validate()
        .context("configuration is invalid after environment overrides")?;
    Ok(config)
}

/// Join positional words into one intent string.
pub fn join_words(words: &[String]) -> String {
    words.join(" ")
}

/// Mask a secret for display, keeping only a short prefix.
pub fn mask_secret(secret: &str) -> String {
    let prefix: String = secret.chars().take(6).collect();
    format!("{prefix}...")
}
