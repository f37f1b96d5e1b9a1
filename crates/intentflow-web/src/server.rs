//! Main web server setup and startup.
//!
//! [`WebServer`] composes the Axum router, registers all routes, and starts
//! the HTTP listener.

use std::sync::Arc;

use axum::Router;
use axum::http::Method;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use intentflow_adapters::{CoinCapAdapter, PriceFeed};
use intentflow_intent::{IntentPipeline, PipelineConfig};

use crate::WebConfig;
use crate::api;
use crate::state::AppState;

/// The IntentFlow web server.
pub struct WebServer {
    config: WebConfig,
    state: Arc<AppState>,
}

impl WebServer {
    /// Create a server around an existing pipeline.
    pub fn new(
        config: WebConfig,
        pipeline: Arc<IntentPipeline>,
        prices: Option<Arc<CoinCapAdapter>>,
    ) -> Self {
        let state = Arc::new(AppState::new(pipeline, prices));
        Self { config, state }
    }

    /// Build the pipeline and price proxy described by `pipeline_config`.
    ///
    /// The proxy and the prompt enricher share one CoinCap client, and
    /// therefore one cache.
    pub fn from_config(
        config: WebConfig,
        pipeline_config: &PipelineConfig,
    ) -> intentflow_intent::Result<Self> {
        let prices = if pipeline_config.market.enabled {
            Some(Arc::new(CoinCapAdapter::new(pipeline_config.coincap_config())?))
        } else {
            None
        };
        let feed = prices
            .as_ref()
            .map(|p| Arc::clone(p) as Arc<dyn PriceFeed>);
        let pipeline = IntentPipeline::from_parts(pipeline_config, None, feed)?;
        Ok(Self::new(config, Arc::new(pipeline), prices))
    }

    /// Return the `host:port` string this server will bind to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.config.bind_addr, self.config.port)
    }

    /// Build the Axum router with all routes registered.
    pub fn router(&self) -> Router {
        router(Arc::clone(&self.state))
    }

    /// Start the server and block until it is shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot be bound.
    pub async fn start(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.addr();
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!(addr = %addr, "starting web server");
        self.serve(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve(
        self,
        listener: TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

/// The API router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/api/parse-intent", post(api::parse_intent))
        .route("/api/crypto-prices", get(api::crypto_prices))
        .route("/api/status", get(api::status))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
