//! CLI argument definitions for IntentFlow.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use intentflow_intent::config::DEFAULT_CONFIG_PATH;

/// IntentFlow -- natural-language intents to on-chain execution rules.
#[derive(Parser)]
#[command(
    name = "intentflow",
    version,
    about = "IntentFlow -- natural-language intents to on-chain execution rules",
    long_about = "Parses free-form automation intents (\"Invest 100 USDC into ETH every \
                  Monday\") into validated, versioned execution rules, using an AI backend \
                  when configured and a deterministic keyword parser otherwise."
)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server.
    Serve {
        /// Address to bind the HTTP server to.
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,

        /// Port to listen on.
        #[arg(long, short, default_value_t = 3000)]
        port: u16,
    },

    /// Parse an intent and print the result as JSON.
    Parse {
        /// The intent text.  Multiple words are joined with spaces.
        #[arg(required = true)]
        text: Vec<String>,

        /// Skip the AI backend and use the keyword parser only.
        #[arg(long)]
        offline: bool,
    },

    /// Print the placeholder intent hash and the rules digest.
    Hash {
        /// The intent text.
        #[arg(required = true)]
        text: Vec<String>,

        /// Timestamp in milliseconds (defaults to now).
        #[arg(long)]
        timestamp: Option<i64>,
    },

    /// Show current prices for the given symbols.
    Prices {
        /// Ticker symbols (e.g. ETH MATIC).
        #[arg(default_values = ["ETH", "BTC", "MATIC"])]
        symbols: Vec<String>,

        /// Also price this much gas (in MATIC) in dollars.
        #[arg(long)]
        gas: Option<f64>,
    },

    /// Show the effective configuration.
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_joins_trailing_words() {
        let cli = Cli::try_parse_from(["intentflow", "parse", "Buy", "ETH", "weekly", "--offline"])
            .unwrap();
        match cli.command {
            Commands::Parse { text, offline } => {
                assert_eq!(text, ["Buy", "ETH", "weekly"]);
                assert!(offline);
            }
            _ => panic!("expected parse"),
        }
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["intentflow", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { bind, port } => {
                assert_eq!(bind, "127.0.0.1");
                assert_eq!(port, 3000);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn prices_default_symbols() {
        let cli = Cli::try_parse_from(["intentflow", "prices"]).unwrap();
        match cli.command {
            Commands::Prices { symbols, gas } => {
                assert_eq!(symbols, ["ETH", "BTC", "MATIC"]);
                assert!(gas.is_none());
            }
            _ => panic!("expected prices"),
        }
    }

    #[test]
    fn parse_requires_text() {
        assert!(Cli::try_parse_from(["intentflow", "parse"]).is_err());
    }
}
