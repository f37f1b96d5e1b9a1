//! Shared application state for the web server.
//!
//! [`AppState`] is wrapped in an `Arc` and shared across all request
//! handlers.  Nothing in it is mutated after startup.

use std::sync::Arc;
use std::time::SystemTime;

use intentflow_adapters::CoinCapAdapter;
use intentflow_intent::IntentPipeline;

/// Shared state accessible from every Axum handler.
#[derive(Clone)]
pub struct AppState {
    /// The intent pipeline.
    pub pipeline: Arc<IntentPipeline>,

    /// CoinCap client for the price proxy.  `None` disables the proxy.
    pub prices: Option<Arc<CoinCapAdapter>>,

    /// When the state was created, for uptime reporting.
    pub started_at: SystemTime,
}

impl AppState {
    pub fn new(pipeline: Arc<IntentPipeline>, prices: Option<Arc<CoinCapAdapter>>) -> Self {
        Self {
            pipeline,
            prices,
            started_at: SystemTime::now(),
        }
    }
}
