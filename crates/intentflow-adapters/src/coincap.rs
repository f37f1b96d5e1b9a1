//! CoinCap price-feed adapter.
//!
//! Features:
//!   - Raw passthrough queries (`price`, `rates`, `markets`) for the HTTP proxy
//!   - Typed [`PriceQuote`] parsing for the prompt enricher
//!   - Optional bearer API key for the higher upstream rate limit
//!   - Short-lived in-memory cache (moka) so bursts of parse requests do not
//!     hammer the upstream

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::{AdapterError, Result};
use crate::symbols::token_id;
use crate::traits::{PriceFeed, PriceQuote};

// ═══════════════════════════════════════════════════════════════════════
//  Constants
// ═══════════════════════════════════════════════════════════════════════

/// Default CoinCap API base URL.
pub const COINCAP_BASE_URL: &str = "https://api.coincap.io/v2";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Cache TTL in seconds.
const CACHE_TTL_SECS: u64 = 30;

/// Maximum cached responses.
const CACHE_MAX_ENTRIES: u64 = 64;

/// Number of assets requested when listing the market.
const TOP_ASSETS_LIMIT: usize = 100;

// ═══════════════════════════════════════════════════════════════════════
//  Configuration
// ═══════════════════════════════════════════════════════════════════════

/// Connection settings for CoinCap.
#[derive(Debug, Clone)]
pub struct CoinCapConfig {
    /// Base URL (e.g. `https://api.coincap.io/v2`).
    pub base_url: String,
    /// Optional API key, sent as a bearer token.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// How long a fetched payload is reused.
    pub cache_ttl: Duration,
}

impl Default for CoinCapConfig {
    fn default() -> Self {
        Self {
            base_url: COINCAP_BASE_URL.to_owned(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(CACHE_TTL_SECS),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Queries
// ═══════════════════════════════════════════════════════════════════════

/// A passthrough query against the CoinCap API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketQuery {
    /// One asset by id, or the top assets when `asset` is `None`.
    Price { asset: Option<String> },
    /// Exchange rates.
    Rates,
    /// Market data, optionally filtered by base asset id.
    Markets { asset: Option<String> },
}

impl MarketQuery {
    /// Build a query from the proxy's `action` and `asset` parameters.
    ///
    /// A missing action means `price`; an unrecognised one lists the top
    /// assets.
    pub fn from_params(action: Option<&str>, asset: Option<&str>) -> Self {
        let asset = asset
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_owned);

        match action.unwrap_or("price") {
            "price" => Self::Price { asset },
            "rates" => Self::Rates,
            "markets" => Self::Markets { asset },
            other => {
                debug!(action = other, "unknown market action, listing top assets");
                Self::Price { asset: None }
            }
        }
    }

    /// Path segments and query parameters relative to the base URL.
    ///
    /// An asset id is always exactly one segment.
    fn path_and_query(&self) -> (Vec<&str>, Vec<(&'static str, String)>) {
        match self {
            Self::Price { asset: Some(id) } => (vec!["assets", id.as_str()], Vec::new()),
            Self::Price { asset: None } => (
                vec!["assets"],
                vec![("limit", TOP_ASSETS_LIMIT.to_string())],
            ),
            Self::Rates => (vec!["rates"], Vec::new()),
            Self::Markets { asset: Some(id) } => (vec!["markets"], vec![("baseId", id.clone())]),
            Self::Markets { asset: None } => (vec!["markets"], Vec::new()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Adapter
// ═══════════════════════════════════════════════════════════════════════

/// CoinCap v2 client.
pub struct CoinCapAdapter {
    config: CoinCapConfig,
    client: reqwest::Client,
    cache: Cache<String, Value>,
}

impl CoinCapAdapter {
    /// Create a new adapter.
    pub fn new(config: CoinCapConfig) -> Result<Self> {
        Url::parse(&config.base_url).map_err(|e| {
            AdapterError::ConfigError(format!("invalid CoinCap base url {}: {e}", config.base_url))
        })?;

        let mut headers = HeaderMap::new();
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| {
                AdapterError::ConfigError(format!("invalid CoinCap API key header: {e}"))
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| AdapterError::ConfigError(format!("failed to build HTTP client: {e}")))?;

        let cache = Cache::builder()
            .max_capacity(CACHE_MAX_ENTRIES)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            config,
            client,
            cache,
        })
    }

    /// Build the absolute URL for `query`.
    ///
    /// Segments are percent-encoded, so `/`, `?` and `#` inside an asset id
    /// cannot leave the `assets/` path.
    fn url_for(&self, query: &MarketQuery) -> Result<Url> {
        let (segments, params) = query.path_and_query();
        if let Some(bad) = segments.iter().find(|s| matches!(s.trim(), "" | "." | "..")) {
            return Err(AdapterError::InvalidInput(format!("invalid asset id: {bad:?}")));
        }

        let mut url = Url::parse(&self.config.base_url).map_err(|e| {
            AdapterError::ConfigError(format!("invalid CoinCap base url {}: {e}", self.config.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                AdapterError::ConfigError(format!(
                    "CoinCap base url cannot carry a path: {}",
                    self.config.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);

        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    /// Run a passthrough query and return the upstream JSON unchanged.
    ///
    /// Non-success statuses surface as [`AdapterError::UpstreamStatus`] so the
    /// HTTP proxy can relay them.
    pub async fn fetch(&self, query: &MarketQuery) -> Result<Value> {
        let url = self.url_for(query)?;
        let cache_key = url.to_string();

        if let Some(cached) = self.cache.get(&cache_key).await {
            debug!(url = %cache_key, "market data cache hit");
            return Ok(cached);
        }

        debug!(url = %cache_key, "fetching market data");
        let resp = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AdapterError::Timeout {
                    seconds: self.config.timeout.as_secs(),
                    reason: e.to_string(),
                }
            } else {
                AdapterError::from(e)
            }
        })?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), body = %body, "CoinCap API error");
            return Err(AdapterError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = serde_json::from_str(&body)?;
        self.cache.insert(cache_key, value.clone()).await;
        Ok(value)
    }

    /// Quote for a single asset id (e.g. `ethereum`).
    pub async fn asset(&self, id: &str) -> Result<PriceQuote> {
        let payload = self
            .fetch(&MarketQuery::Price {
                asset: Some(id.to_owned()),
            })
            .await?;
        quotes_from_payload(&payload)?
            .into_iter()
            .next()
            .ok_or_else(|| AdapterError::InvalidPayload {
                reason: format!("no usable quote for asset {id}"),
            })
    }

    /// USD price for a ticker symbol (e.g. `MATIC`).
    pub async fn price_of(&self, symbol: &str) -> Result<f64> {
        self.asset(&token_id(symbol)).await.map(|q| q.price_usd)
    }
}

#[async_trait]
impl PriceFeed for CoinCapAdapter {
    fn name(&self) -> &str {
        "coincap"
    }

    async fn top_assets(&self, limit: usize) -> Result<Vec<PriceQuote>> {
        let payload = self.fetch(&MarketQuery::Price { asset: None }).await?;
        let mut quotes = quotes_from_payload(&payload)?;
        quotes.truncate(limit);
        Ok(quotes)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Payload parsing
// ═══════════════════════════════════════════════════════════════════════

/// CoinCap encodes every number as a string.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetRecord {
    id: String,
    symbol: String,
    #[serde(default)]
    name: String,
    price_usd: Option<String>,
    #[serde(rename = "changePercent24Hr")]
    change_percent_24h: Option<String>,
}

impl AssetRecord {
    fn into_quote(self) -> Option<PriceQuote> {
        let price_usd = self.price_usd.as_deref()?.parse::<f64>().ok()?;
        if !price_usd.is_finite() {
            return None;
        }
        Some(PriceQuote {
            id: self.id,
            symbol: self.symbol,
            name: self.name,
            price_usd,
            change_percent_24h: self
                .change_percent_24h
                .as_deref()
                .and_then(|c| c.parse().ok()),
        })
    }
}

/// Parse a CoinCap `{ "data": ... }` payload into quotes.
///
/// `data` may be a single asset or a list.  Entries without a parseable
/// price are skipped; a payload without `data` is an error.
pub fn quotes_from_payload(payload: &Value) -> Result<Vec<PriceQuote>> {
    let data = payload
        .get("data")
        .ok_or_else(|| AdapterError::InvalidPayload {
            reason: "missing `data` field".into(),
        })?;

    let records: Vec<Value> = match data {
        Value::Array(items) => items.clone(),
        Value::Object(_) => vec![data.clone()],
        other => {
            return Err(AdapterError::InvalidPayload {
                reason: format!("unexpected `data` type: {other}"),
            });
        }
    };

    Ok(records
        .into_iter()
        .filter_map(|item| serde_json::from_value::<AssetRecord>(item).ok())
        .filter_map(AssetRecord::into_quote)
        .collect())
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
