//! REST API route handlers.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use intentflow_adapters::{AdapterError, MarketQuery};
use intentflow_intent::{IntentError, IntentPipeline, ParsedIntent, generate_intent_hash};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// POST /api/parse-intent
// ---------------------------------------------------------------------------

/// Response payload for `/api/parse-intent`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseIntentResponse {
    #[serde(flatten)]
    pub intent: ParsedIntent,
    /// Whether the fallback parser produced the result.
    pub fallback: bool,
    /// Why the fallback parser was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Model that produced an AI result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// SHA-256 of `executionRules`.
    pub rules_digest: String,
    /// Provisional on-chain identifier (not a cryptographic digest).
    pub intent_hash: String,
    pub request_id: String,
}

fn invalid_input() -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": IntentError::EmptyInput.to_string() })),
    )
}

/// Parse free text into a structured intent.
///
/// Takes the raw body so that malformed JSON, a missing `userInput`, a
/// non-string `userInput` and blank text all get the same 400 payload.
pub async fn parse_intent(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let request_id = uuid::Uuid::now_v7().to_string();

    let user_input = match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(mut fields)) => match fields.remove("userInput") {
            Some(Value::String(text)) => text,
            _ => return invalid_input(),
        },
        _ => return invalid_input(),
    };

    if IntentPipeline::validate_input(&user_input).is_err() {
        tracing::debug!(request_id = %request_id, "rejected blank intent");
        return invalid_input();
    }

    tracing::info!(request_id = %request_id, len = user_input.len(), "parse-intent request");

    let outcome = state.pipeline.parse_intent(&user_input).await;
    let rules_digest = outcome.rules_digest();
    let intent_hash = generate_intent_hash(&user_input, chrono::Utc::now().timestamp_millis());

    let response = ParseIntentResponse {
        fallback: outcome.used_fallback(),
        error: outcome.diagnostic,
        model: outcome.model,
        rules_digest,
        intent_hash,
        request_id: request_id.clone(),
        intent: outcome.intent,
    };

    tracing::info!(
        request_id = %request_id,
        fallback = response.fallback,
        frequency = %response.intent.frequency,
        "parse-intent complete"
    );

    match serde_json::to_value(&response) {
        Ok(v) => (StatusCode::OK, Json(v)),
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "failed to serialize response");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Unexpected error occurred" })),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// GET /api/crypto-prices
// ---------------------------------------------------------------------------

/// Query parameters for the price proxy.
#[derive(Debug, Default, Deserialize)]
pub struct PriceParams {
    pub action: Option<String>,
    pub asset: Option<String>,
}

/// Relay a CoinCap query, passing upstream failure statuses through.
pub async fn crypto_prices(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PriceParams>,
) -> (StatusCode, Json<Value>) {
    let Some(prices) = &state.prices else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Market data is disabled" })),
        );
    };

    let query = MarketQuery::from_params(params.action.as_deref(), params.asset.as_deref());

    match prices.fetch(&query).await {
        Ok(data) => (StatusCode::OK, Json(data)),
        Err(e) => match e.status() {
            Some(status) => {
                let code = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                (
                    code,
                    Json(json!({ "error": format!("CoinCap API error: {status}") })),
                )
            }
            None if matches!(e, AdapterError::InvalidInput(_)) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            ),
            None => {
                tracing::warn!(error = %e, ?query, "price proxy failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": e.to_string() })),
                )
            }
        },
    }
}

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

/// Response payload for the `/api/status` endpoint.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub ai_backend: bool,
    pub market_context: bool,
    pub price_proxy: bool,
    pub models: Vec<String>,
}

/// Liveness plus configuration summary.  `degraded` means every parse
/// will use the fallback parser.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let uptime = SystemTime::now()
        .duration_since(state.started_at)
        .unwrap_or(Duration::ZERO)
        .as_secs();
    let ai_backend = state.pipeline.has_backend();

    Json(StatusResponse {
        status: if ai_backend { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: uptime,
        ai_backend,
        market_context: state.pipeline.has_market_context(),
        price_proxy: state.prices.is_some(),
        models: state.pipeline.models().models().to_vec(),
    })
}
