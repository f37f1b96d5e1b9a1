//! Market data adapters for IntentFlow.
//!
//! The intent pipeline uses live prices only as advisory context for the AI
//! prompt, so everything here is read-only and best-effort.
//!
//! - [`traits`] -- The [`PriceFeed`] trait and the [`PriceQuote`] record.
//! - [`coincap`] -- CoinCap v2 implementation with a short-lived cache.
//! - [`symbols`] -- Symbol → asset-id table and price formatting helpers.
//! - [`error`] -- Adapter error types.

pub mod coincap;
pub mod error;
pub mod symbols;
pub mod traits;

pub use coincap::{CoinCapAdapter, CoinCapConfig, MarketQuery};
pub use error::{AdapterError, Result};
pub use symbols::{format_price, gas_cost_usd, token_id};
pub use traits::{PriceFeed, PriceQuote};
