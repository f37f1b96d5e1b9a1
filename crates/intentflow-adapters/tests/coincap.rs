//! End-to-end tests for the CoinCap adapter.
//!
//! These tests spin up a fake CoinCap server on an OS-assigned ephemeral
//! port and point the adapter at it, exercising the real HTTP path.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use intentflow_adapters::{AdapterError, CoinCapAdapter, CoinCapConfig, MarketQuery, PriceFeed};

// ── helpers ──────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct Hits(Arc<AtomicUsize>);

async fn list_assets(State(hits): State<Hits>) -> Json<Value> {
    hits.0.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "data": [
            { "id": "bitcoin", "symbol": "BTC", "name": "Bitcoin", "priceUsd": "64000.5" },
            { "id": "ethereum", "symbol": "ETH", "name": "Ethereum", "priceUsd": "3100.25" },
            { "id": "matic-network", "symbol": "MATIC", "name": "Polygon", "priceUsd": "0.7" }
        ],
        "timestamp": 1_700_000_000_000u64
    }))
}

async fn one_asset(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if id == "matic-network" {
        (
            StatusCode::OK,
            Json(json!({ "data": { "id": id, "symbol": "MATIC", "name": "Polygon", "priceUsd": "0.7" } })),
        )
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("{id} not found") })),
        )
    }
}

/// Bind to 127.0.0.1:0, start the fake upstream, return (base_url, hits).
async fn start_fake_coincap() -> (String, Hits) {
    let hits = Hits::default();
    let app = Router::new()
        .route("/v2/assets", get(list_assets))
        .route("/v2/assets/{id}", get(one_asset))
        .with_state(hits.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind to port 0");
    let addr: SocketAddr = listener.local_addr().expect("get local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    (format!("http://127.0.0.1:{}/v2", addr.port()), hits)
}

fn adapter(base_url: String) -> CoinCapAdapter {
    CoinCapAdapter::new(CoinCapConfig {
        base_url,
        ..CoinCapConfig::default()
    })
    .expect("adapter")
}

// ── tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn top_assets_are_parsed_and_truncated() {
    let (base, _) = start_fake_coincap().await;
    let feed = adapter(base);

    let quotes = feed.top_assets(2).await.unwrap();
    assert_eq!(quotes.len(), 2);
    assert_eq!(quotes[0].symbol, "BTC");
    assert_eq!(quotes[1].symbol, "ETH");
}

#[tokio::test]
async fn repeated_queries_hit_the_cache() {
    let (base, hits) = start_fake_coincap().await;
    let feed = adapter(base);

    feed.top_assets(5).await.unwrap();
    feed.top_assets(5).await.unwrap();
    assert_eq!(hits.0.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn price_of_symbol_uses_asset_id() {
    let (base, _) = start_fake_coincap().await;
    let feed = adapter(base);

    let price = feed.price_of("matic").await.unwrap();
    assert!((price - 0.7).abs() < f64::EPSILON);
}

#[tokio::test]
async fn upstream_status_is_relayed() {
    let (base, _) = start_fake_coincap().await;
    let feed = adapter(base);

    let err = feed
        .fetch(&MarketQuery::Price {
            asset: Some("dogecoin".into()),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AdapterError::UpstreamStatus { status: 404, .. }));
}

#[tokio::test]
async fn unreachable_upstream_is_an_http_error() {
    let feed = adapter("http://127.0.0.1:1/v2".into());
    let err = feed.top_assets(5).await.unwrap_err();
    assert!(matches!(
        err,
        AdapterError::Http { .. } | AdapterError::Timeout { .. }
    ));
}
