//! Symbol lookup and price formatting.

/// Ticker symbol → CoinCap asset id.
pub const TOKEN_IDS: &[(&str, &str)] = &[
    ("ETH", "ethereum"),
    ("BTC", "bitcoin"),
    ("MATIC", "matic-network"),
    ("USDC", "usd-coin"),
    ("USDT", "tether"),
    ("DAI", "dai"),
    ("WETH", "wrapped-ether"),
    ("WBTC", "wrapped-bitcoin"),
];

/// Resolve a ticker symbol to its CoinCap asset id.
///
/// Unknown symbols fall through as their lower-cased form, which matches
/// CoinCap's id for most assets.
pub fn token_id(symbol: &str) -> String {
    let upper = symbol.trim().to_uppercase();
    TOKEN_IDS
        .iter()
        .find(|(sym, _)| *sym == upper)
        .map(|(_, id)| (*id).to_owned())
        .unwrap_or_else(|| symbol.trim().to_lowercase())
}

/// Format a dollar price with precision appropriate to its magnitude.
pub fn format_price(price: f64) -> String {
    if price >= 1.0 {
        format!("${price:.2}")
    } else if price >= 0.01 {
        format!("${price:.4}")
    } else {
        format!("${price:.8}")
    }
}

/// Dollar cost of `gas_amount` native tokens at `native_price_usd`.
///
/// Without a price the amount is reported in MATIC.
pub fn gas_cost_usd(gas_amount: f64, native_price_usd: Option<f64>) -> String {
    match native_price_usd {
        Some(price) => format!("${:.4}", gas_amount * price),
        None => format!("{gas_amount} MATIC"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_symbols_resolve() {
        assert_eq!(token_id("eth"), "ethereum");
        assert_eq!(token_id("MATIC"), "matic-network");
        assert_eq!(token_id(" usdc "), "usd-coin");
    }

    #[test]
    fn unknown_symbol_is_lowercased() {
        assert_eq!(token_id("SOL"), "sol");
    }

    #[test]
    fn price_precision_by_magnitude() {
        assert_eq!(format_price(2456.789), "$2456.79");
        assert_eq!(format_price(0.5), "$0.5000");
        assert_eq!(format_price(0.000_012_34), "$0.00001234");
    }

    #[test]
    fn gas_cost_formats() {
        assert_eq!(gas_cost_usd(0.02, Some(0.5)), "$0.0100");
        assert_eq!(gas_cost_usd(0.02, None), "0.02 MATIC");
    }
}
