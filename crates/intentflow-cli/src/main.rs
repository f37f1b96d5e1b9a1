//! CLI entry point for IntentFlow.
//!
//! This binary provides the `intentflow` command with subcommands for
//! serving the HTTP API, parsing and hashing intents from the terminal,
//! looking up prices, and checking configuration.

mod cli;
mod helpers;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::{info, warn};

use intentflow_adapters::{CoinCapAdapter, format_price, gas_cost_usd};
use intentflow_intent::{IntentPipeline, content_digest, generate_intent_hash, parse_fallback};
use intentflow_web::{WebConfig, WebServer};

use crate::cli::{Cli, Commands};
use crate::helpers::{init_tracing, join_words, load_config, mask_secret};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config_path = cli.config.as_path();

    match cli.command {
        Commands::Serve { bind, port } => cmd_serve(config_path, bind, port).await,
        Commands::Parse { text, offline } => cmd_parse(config_path, &join_words(&text), offline).await,
        Commands::Hash { text, timestamp } => cmd_hash(&join_words(&text), timestamp),
        Commands::Prices { symbols, gas } => cmd_prices(config_path, &symbols, gas).await,
        Commands::Status => cmd_status(config_path),
    }
}

// ---------------------------------------------------------------------------
// Subcommand: serve
// ---------------------------------------------------------------------------

async fn cmd_serve(config_path: &Path, bind: String, port: u16) -> Result<()> {
    init_tracing("info");

    let config = load_config(config_path)?;
    let web = WebConfig {
        bind_addr: bind,
        port,
    };
    let server = WebServer::from_config(web, &config).context("failed to build web server")?;

    info!(addr = %server.addr(), "IntentFlow API starting");
    server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("web server error: {e}"))
}

// ---------------------------------------------------------------------------
// Subcommand: parse
// ---------------------------------------------------------------------------

async fn cmd_parse(config_path: &Path, text: &str, offline: bool) -> Result<()> {
    init_tracing("warn");

    let text = IntentPipeline::validate_input(text)?;

    let pipeline = if offline {
        IntentPipeline::new()
    } else {
        let config = load_config(config_path)?;
        IntentPipeline::from_config(&config).context("failed to build intent pipeline")?
    };

    let outcome = pipeline.parse_intent(text).await;
    if let Some(diagnostic) = &outcome.diagnostic
        && !offline
    {
        warn!(diagnostic = %diagnostic, "used fallback parser");
    }

    let mut value = serde_json::to_value(&outcome.intent)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("fallback".into(), json!(outcome.used_fallback()));
        obj.insert("rulesDigest".into(), json!(outcome.rules_digest()));
        if let Some(diagnostic) = &outcome.diagnostic {
            obj.insert("error".into(), json!(diagnostic));
        }
        if let Some(model) = &outcome.model {
            obj.insert("model".into(), json!(model));
        }
    }

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: hash
// ---------------------------------------------------------------------------

fn cmd_hash(text: &str, timestamp: Option<i64>) -> Result<()> {
    let text = IntentPipeline::validate_input(text)?;
    let timestamp = timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

    // The rules digest comes from the deterministic parse, so it is
    // reproducible without an AI backend.
    let parsed = parse_fallback(text);

    println!();
    println!("  Intent:         {text}");
    println!("  Timestamp:      {timestamp}");
    println!("  Intent hash:    {}", generate_intent_hash(text, timestamp));
    println!("  Rules:          {}", parsed.execution_rules);
    println!("  Rules digest:   {}", content_digest(&parsed.execution_rules));
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: prices
// ---------------------------------------------------------------------------

async fn cmd_prices(config_path: &Path, symbols: &[String], gas: Option<f64>) -> Result<()> {
    init_tracing("warn");

    let config = load_config(config_path)?;
    let adapter =
        CoinCapAdapter::new(config.coincap_config()).context("failed to build CoinCap client")?;

    println!();
    for symbol in symbols {
        match adapter.price_of(symbol).await {
            Ok(price) => println!("  {:<8} {}", symbol.to_uppercase(), format_price(price)),
            Err(e) => println!("  {:<8} unavailable ({e})", symbol.to_uppercase()),
        }
    }

    if let Some(amount) = gas {
        let matic = match adapter.price_of("MATIC").await {
            Ok(price) => Some(price),
            Err(e) => {
                warn!(error = %e, "MATIC price unavailable");
                None
            }
        };
        println!();
        println!("  Gas {amount} MATIC = {}", gas_cost_usd(amount, matic));
    }
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: status
// ---------------------------------------------------------------------------

fn cmd_status(config_path: &Path) -> Result<()> {
    init_tracing("warn");

    println!();
    println!("  IntentFlow Status");
    println!("  =================");
    println!();

    if config_path.exists() {
        println!("  Config:           OK ({})", config_path.display());
    } else {
        println!("  Config:           MISSING (using defaults)");
    }

    let config = load_config(config_path)?;

    match config.ai.api_key() {
        Some(key) => println!("  AI API key:       CONFIGURED ({})", mask_secret(key)),
        None => println!("  AI API key:       NOT SET (fallback parser only)"),
    }
    println!("  AI endpoint:      {}", config.ai.base_url);
    println!("  Models:           {}", config.model_chain().models().join(" -> "));

    let policy = config.retry_policy();
    let schedule: Vec<String> = policy
        .schedule()
        .iter()
        .map(|d| format!("{}ms", d.as_millis()))
        .collect();
    println!(
        "  Retry:            {} attempts per model, backoff [{}]",
        policy.max_attempts(),
        schedule.join(", ")
    );

    if config.market.enabled {
        println!("  Market context:   ENABLED ({})", config.market.base_url);
    } else {
        println!("  Market context:   DISABLED");
    }
    println!();

    Ok(())
}
