//! Market context enrichment for the AI prompt.
//!
//! Enrichment is best-effort: whatever goes wrong, the base prompt is
//! returned unchanged and parsing continues.

use std::sync::Arc;
use std::time::Duration;

use intentflow_adapters::{PriceFeed, PriceQuote};

/// Symbols worth quoting to the model.
pub const DEFAULT_SYMBOLS: &[&str] = &["ETH", "BTC", "MATIC", "USDC", "USDT"];

/// Maximum number of quotes included in the prompt.
pub const DEFAULT_MAX_ENTRIES: usize = 5;

/// How many top assets to request from the feed.
const FEED_LIMIT: usize = 100;

/// Appends current prices for a small allow-list of assets to a prompt.
#[derive(Clone)]
pub struct MarketContext {
    feed: Arc<dyn PriceFeed>,
    symbols: Vec<String>,
    max_entries: usize,
    timeout: Duration,
}

impl std::fmt::Debug for MarketContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketContext")
            .field("feed", &self.feed.name())
            .field("symbols", &self.symbols)
            .field("max_entries", &self.max_entries)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl MarketContext {
    pub fn new(feed: Arc<dyn PriceFeed>) -> Self {
        Self {
            feed,
            symbols: DEFAULT_SYMBOLS.iter().map(|s| (*s).to_owned()).collect(),
            max_entries: DEFAULT_MAX_ENTRIES,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Return `base` with a price line appended, or `base` unchanged when no
    /// usable prices are available.
    pub async fn enrich(&self, base: &str) -> String {
        let quotes = match tokio::time::timeout(self.timeout, self.feed.top_assets(FEED_LIMIT)).await
        {
            Ok(Ok(quotes)) => quotes,
            Ok(Err(e)) => {
                tracing::info!(feed = self.feed.name(), error = %e, "market context unavailable");
                return base.to_owned();
            }
            Err(_) => {
                tracing::info!(
                    feed = self.feed.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "market context timed out"
                );
                return base.to_owned();
            }
        };

        match self.price_line(&quotes) {
            Some(line) => {
                tracing::debug!(line = %line, "prompt enriched with market context");
                format!("{base}\n\nCurrent crypto prices: {line}. Use current market prices when relevant.")
            }
            None => {
                tracing::debug!("no allow-listed assets in price feed");
                base.to_owned()
            }
        }
    }

    /// `"SYM: $X.XX"` entries for allow-listed symbols, feed order preserved.
    fn price_line(&self, quotes: &[PriceQuote]) -> Option<String> {
        let entries: Vec<String> = quotes
            .iter()
            .filter(|q| q.price_usd.is_finite())
            .filter(|q| self.symbols.iter().any(|s| s.eq_ignore_ascii_case(&q.symbol)))
            .take(self.max_entries)
            .map(|q| format!("{}: ${:.2}", q.symbol, q.price_usd))
            .collect();

        if entries.is_empty() {
            None
        } else {
            Some(entries.join(", "))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
