//! End-to-end tests for the HTTP API.
//!
//! These tests spin up the real Axum router on an OS-assigned ephemeral
//! port and call it with `reqwest`.  The AI backend is an in-process fake
//! and CoinCap is a second local Axum server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::get;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use intentflow_adapters::{CoinCapAdapter, CoinCapConfig};
use intentflow_agent::{AgentError, CompletionBackend, CompletionRequest};
use intentflow_intent::{IntentPipeline, PipelineConfig};
use intentflow_web::{AppState, WebConfig, WebServer, server};

// ── helpers ──────────────────────────────────────────────────────────────────

struct FixedBackend(Result<&'static str, u16>);

#[async_trait]
impl CompletionBackend for FixedBackend {
    fn provider(&self) -> &str {
        "fixed"
    }

    async fn generate(&self, _request: &CompletionRequest) -> intentflow_agent::Result<String> {
        match self.0 {
            Ok(text) => Ok(text.to_owned()),
            Err(status) => Err(AgentError::Backend {
                status,
                message: "Gemini API request failed".into(),
            }),
        }
    }
}

async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind to port 0");
    let addr: SocketAddr = listener.local_addr().expect("get local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    format!("http://127.0.0.1:{}", addr.port())
}

async fn one_asset(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if id == "ethereum" {
        (
            StatusCode::OK,
            Json(json!({ "data": { "id": "ethereum", "symbol": "ETH", "name": "Ethereum", "priceUsd": "3100.25" } })),
        )
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" })))
    }
}

async fn start_fake_coincap() -> String {
    let app = Router::new()
        .route("/v2/assets/{id}", get(one_asset))
        .route(
            "/v2/rates",
            get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
    format!("{}/v2", spawn(app).await)
}

/// Start the API with `pipeline` and an optional CoinCap base URL.
async fn start_api(pipeline: IntentPipeline, coincap: Option<String>) -> String {
    let prices = coincap.map(|base_url| {
        Arc::new(
            CoinCapAdapter::new(CoinCapConfig {
                base_url,
                ..CoinCapConfig::default()
            })
            .expect("adapter"),
        )
    });
    let state = AppState::new(Arc::new(pipeline), prices);
    spawn(server::router(Arc::new(state))).await
}

async fn post_intent(base: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/parse-intent"))
        .json(&body)
        .send()
        .await
        .expect("request failed");
    let status = resp.status().as_u16();
    (status, resp.json().await.expect("invalid JSON"))
}

const AI_JSON: &str = r#"{"actions":["Swap USDC to ETH"],"frequency":"Weekly","riskWarnings":["Volatility"],"safetyConstraints":["Max 100 USDC"],"estimatedGas":"0.02 MATIC"}"#;

// ── configuration ────────────────────────────────────────────────────────────

#[test]
fn web_config_defaults() {
    let config = WebConfig::default();
    assert_eq!(config.bind_addr, "127.0.0.1");
    assert_eq!(config.port, 3000);
}

#[test]
fn server_from_default_config_has_no_backend() {
    let server = WebServer::from_config(
        WebConfig {
            bind_addr: "0.0.0.0".into(),
            port: 8080,
        },
        &PipelineConfig::default(),
    )
    .expect("server");
    assert_eq!(server.addr(), "0.0.0.0:8080");
}

// ── POST /api/parse-intent ───────────────────────────────────────────────────

#[tokio::test]
async fn parse_without_key_uses_fallback() {
    let base = start_api(IntentPipeline::new(), None).await;
    let (status, json) =
        post_intent(&base, json!({ "userInput": "Invest 100 USDC into ETH every Monday" })).await;

    assert_eq!(status, 200);
    assert_eq!(json["fallback"], true);
    assert_eq!(json["usedFallback"], true);
    assert_eq!(json["error"], "AI API key not configured");
    assert_eq!(json["intent"], "Invest 100 USDC into ETH every Monday");
    assert_eq!(
        json["actions"],
        json!(["Swap tokens via DEX", "Transfer tokens to wallet"])
    );
    assert_eq!(json["frequency"], "Weekly");
    assert_eq!(json["estimatedGas"], "0.02 MATIC");

    let digest = json["rulesDigest"].as_str().expect("rulesDigest");
    assert_eq!(digest.len(), 2 + 64);
    assert!(digest.starts_with("0x"));
    assert!(json["intentHash"].as_str().expect("intentHash").starts_with("0x"));
    assert!(json["requestId"].is_string());

    let rules: Value =
        serde_json::from_str(json["executionRules"].as_str().expect("executionRules"))
            .expect("rules are JSON");
    assert_eq!(rules["version"], "1.0");
    assert_eq!(rules["conditions"], json!([]));
}

#[tokio::test]
async fn parse_with_ai_backend() {
    let pipeline = IntentPipeline::new().with_backend(Arc::new(FixedBackend(Ok(AI_JSON))));
    let base = start_api(pipeline, None).await;
    let (status, json) = post_intent(&base, json!({ "userInput": "Buy ETH weekly" })).await;

    assert_eq!(status, 200);
    assert_eq!(json["fallback"], false);
    assert!(json.get("error").is_none());
    assert_eq!(json["model"], "gemini-2.5-flash");
    assert_eq!(json["actions"], json!(["Swap USDC to ETH"]));
}

#[tokio::test]
async fn backend_failure_reports_diagnostic() {
    let pipeline = IntentPipeline::new().with_backend(Arc::new(FixedBackend(Err(500))));
    let base = start_api(pipeline, None).await;
    let (status, json) =
        post_intent(&base, json!({ "userInput": "Sell my ETH if price drops below $2000" })).await;

    assert_eq!(status, 200);
    assert_eq!(json["fallback"], true);
    assert_eq!(json["error"], "Gemini API request failed");
    assert_eq!(json["frequency"], "Conditional");
}

#[tokio::test]
async fn invalid_input_is_rejected() {
    let base = start_api(IntentPipeline::new(), None).await;
    let expected = json!({ "error": "Invalid input. Please provide a valid intent description." });

    for body in [
        json!({ "userInput": "" }),
        json!({ "userInput": "   " }),
        json!({ "userInput": 42 }),
        json!({ "somethingElse": "x" }),
        json!("just a string"),
    ] {
        let (status, json) = post_intent(&base, body).await;
        assert_eq!(status, 400);
        assert_eq!(json, expected);
    }
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let base = start_api(IntentPipeline::new(), None).await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/parse-intent"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 400);
}

// ── GET /api/crypto-prices ───────────────────────────────────────────────────

#[tokio::test]
async fn price_proxy_relays_upstream_payload() {
    let coincap = start_fake_coincap().await;
    let base = start_api(IntentPipeline::new(), Some(coincap)).await;

    let resp = reqwest::get(format!("{base}/api/crypto-prices?action=price&asset=ethereum"))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 200);
    let json: Value = resp.json().await.expect("invalid JSON");
    assert_eq!(json["data"]["priceUsd"], "3100.25");
}

#[tokio::test]
async fn price_proxy_relays_upstream_status() {
    let coincap = start_fake_coincap().await;
    let base = start_api(IntentPipeline::new(), Some(coincap)).await;

    let resp = reqwest::get(format!("{base}/api/crypto-prices?asset=dogecoin"))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 404);
    let json: Value = resp.json().await.expect("invalid JSON");
    assert_eq!(json, json!({ "error": "CoinCap API error: 404" }));

    let resp = reqwest::get(format!("{base}/api/crypto-prices?action=rates"))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 429);
}

#[tokio::test]
async fn price_proxy_keeps_asset_inside_assets_path() {
    let coincap = start_fake_coincap().await;
    let base = start_api(IntentPipeline::new(), Some(coincap)).await;

    // Encoded as one segment, so the fake sees an unknown asset rather
    // than the rates route.
    let resp = reqwest::get(format!("{base}/api/crypto-prices?asset=..%2Frates"))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 404);

    let resp = reqwest::get(format!("{base}/api/crypto-prices?asset=.."))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn price_proxy_disabled() {
    let base = start_api(IntentPipeline::new(), None).await;
    let resp = reqwest::get(format!("{base}/api/crypto-prices"))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 503);
}

// ── GET /api/status ──────────────────────────────────────────────────────────

#[tokio::test]
async fn status_reports_configuration() {
    let base = start_api(IntentPipeline::new(), None).await;
    let json: Value = reqwest::get(format!("{base}/api/status"))
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid JSON");

    assert_eq!(json["status"], "degraded");
    assert_eq!(json["ai_backend"], false);
    assert_eq!(json["price_proxy"], false);
    assert_eq!(json["models"], json!(["gemini-2.5-flash", "gemini-2.5-pro"]));
}
