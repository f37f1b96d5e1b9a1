//! HTTP interface for IntentFlow.
//!
//! This crate exposes the intent pipeline and the market-data proxy over a
//! small JSON API:
//!
//! - `POST /api/parse-intent` -- parse free text into a [`ParsedIntent`].
//! - `GET /api/crypto-prices` -- relay CoinCap price, rate and market data.
//! - `GET /api/status` -- liveness plus a summary of the configured backends.
//!
//! [`ParsedIntent`]: intentflow_intent::ParsedIntent

pub mod api;
pub mod server;
pub mod state;

pub use server::WebServer;
pub use state::AppState;

/// Web server configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// The address to bind the HTTP server to.
    pub bind_addr: String,
    /// The port to listen on.
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 3000,
        }
    }
}
