//! Core price-feed trait and supporting types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single asset price observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    /// Upstream asset identifier (e.g. `ethereum`).
    pub id: String,
    /// Ticker symbol (e.g. `ETH`).
    pub symbol: String,
    /// Display name.
    pub name: String,
    /// Price in US dollars.
    pub price_usd: f64,
    /// Percentage change over the last 24 hours, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_percent_24h: Option<f64>,
}

/// A read-only source of asset prices.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// The top `limit` assets by market cap.
    async fn top_assets(&self, limit: usize) -> Result<Vec<PriceQuote>>;
}
