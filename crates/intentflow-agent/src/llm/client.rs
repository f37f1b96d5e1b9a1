//! Gemini completion client.
//!
//! Talks to the Google Generative Language `generateContent` endpoint in
//! non-streaming mode and returns the first candidate's text.  One call is
//! one network attempt; retries live in [`super::retry`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Value, json};
use url::Url;

use crate::error::{AgentError, Result};
use crate::llm::types::{CompletionBackend, CompletionRequest};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default Gemini API base URL.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default per-request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Generic message used when the error body carries nothing useful.
const GENERIC_FAILURE: &str = "Gemini API request failed";

// ---------------------------------------------------------------------------
// Client configuration
// ---------------------------------------------------------------------------

/// Configuration for connecting to the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiClientConfig {
    /// API key, sent as the `key` query parameter.
    pub api_key: String,
    /// Base URL, without a trailing `/models` segment.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl GeminiClientConfig {
    /// Configuration for the public Gemini endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Point the client at a different base URL (proxies, local fakes).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the Gemini `generateContent` API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: Arc<GeminiClientConfig>,
    http: reqwest::Client,
}

impl GeminiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: GeminiClientConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AgentError::MissingApiKey {
                provider: "gemini".into(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::LlmRequestFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }

    /// The endpoint URL for `model`, including the key parameter.
    fn endpoint(&self, model: &str) -> Result<Url> {
        let base = self.config.base_url.trim_end_matches('/');
        Url::parse_with_params(
            &format!("{base}/models/{model}:generateContent"),
            &[("key", self.config.api_key.as_str())],
        )
        .map_err(|e| AgentError::ConfigError {
            reason: format!("invalid Gemini endpoint for model {model}: {e}"),
        })
    }
}

#[async_trait]
impl CompletionBackend for GeminiClient {
    fn provider(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &CompletionRequest) -> Result<String> {
        let url = self.endpoint(&request.model)?;
        let body = build_request_body(request);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let key_prefix: String = self.config.api_key.chars().take(6).collect();
        tracing::debug!(
            model = %request.model,
            key_prefix = %key_prefix,
            prompt_len = request.prompt.len(),
            "sending Gemini request"
        );

        let resp = self
            .http
            .post(url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::LlmRequestFailed {
                reason: e.without_url().to_string(),
            })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AgentError::LlmRequestFailed {
                reason: format!("failed to read response body: {e}"),
            })?;

        if !status.is_success() {
            let message = backend_error_message(status.as_u16(), &text);
            tracing::warn!(
                model = %request.model,
                status = status.as_u16(),
                message = %message,
                "Gemini API error"
            );
            return Err(AgentError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let v: Value = serde_json::from_str(&text).map_err(|e| AgentError::LlmParseFailed {
            reason: format!("invalid JSON response: {e}"),
        })?;

        parse_gemini_response(&v)
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// Build the JSON body for `generateContent`.
pub fn build_request_body(request: &CompletionRequest) -> Value {
    let mut generation_config = json!({
        "temperature": request.temperature,
        "maxOutputTokens": request.max_output_tokens,
    });

    if let Some(mime) = &request.response_mime_type {
        generation_config["responseMimeType"] = json!(mime);
    }

    json!({
        "contents": [
            { "parts": [ { "text": request.prompt } ] }
        ],
        "generationConfig": generation_config,
    })
}

/// Pull the first candidate's text out of a `generateContent` response.
pub fn parse_gemini_response(v: &Value) -> Result<String> {
    v.pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| AgentError::LlmParseFailed {
            reason: "response contained no candidate text".into(),
        })
}

/// Derive a human-readable message from an error response.
///
/// Looks for `error.message`, then a string `error`, then falls back to a
/// generic message.  Leaked or invalid keys and exhausted quotas are
/// rewritten into actionable advice.
pub fn backend_error_message(status: u16, body: &str) -> String {
    let extracted = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.pointer("/error/message")
            .and_then(Value::as_str)
            .or_else(|| v.get("error").and_then(Value::as_str))
            .map(str::to_owned)
    });

    let Some(message) = extracted else {
        if status == 429 {
            return quota_message();
        }
        return GENERIC_FAILURE.to_owned();
    };

    if message.contains("leaked") || message.contains("API key") {
        "API key issue detected. Please get a new Gemini API key from https://aistudio.google.com"
            .to_owned()
    } else if message.contains("quota") || message.contains("429") || status == 429 {
        quota_message()
    } else {
        message
    }
}

fn quota_message() -> String {
    "API quota exceeded. The free tier has limited requests. Please wait a few minutes or \
     upgrade your plan. Using fallback parser."
        .to_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_rejected() {
        let err = GeminiClient::new(GeminiClientConfig::new("  ")).unwrap_err();
        assert!(matches!(err, AgentError::MissingApiKey { .. }));
    }

    #[test]
    fn endpoint_includes_model_and_key() {
        let client = GeminiClient::new(
            GeminiClientConfig::new("abc123").with_base_url("http://localhost:9999/v1beta/"),
        )
        .unwrap();
        let url = client.endpoint("gemini-2.5-flash").unwrap();
        assert_eq!(url.path(), "/v1beta/models/gemini-2.5-flash:generateContent");
        assert_eq!(url.query(), Some("key=abc123"));
    }

    #[test]
    fn request_body_shape() {
        let req = CompletionRequest::json("parse this").for_model("m");
        let body = build_request_body(&req);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "parse this");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1500);
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert!(body.get("model").is_none());
    }

    #[test]
    fn request_body_without_mime_hint() {
        let mut req = CompletionRequest::json("x");
        req.response_mime_type = None;
        let body = build_request_body(&req);
        assert!(body["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn parse_candidate_text() {
        let v = json!({
            "candidates": [
                { "content": { "parts": [ { "text": "{\"actions\":[]}" } ] } }
            ]
        });
        assert_eq!(parse_gemini_response(&v).unwrap(), "{\"actions\":[]}");
    }

    #[test]
    fn parse_missing_candidates_fails() {
        let v = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(matches!(
            parse_gemini_response(&v),
            Err(AgentError::LlmParseFailed { .. })
        ));
    }

    #[test]
    fn error_message_from_nested_object() {
        let body = r#"{"error":{"code":500,"message":"Internal error encountered."}}"#;
        assert_eq!(
            backend_error_message(500, body),
            "Internal error encountered."
        );
    }

    #[test]
    fn error_message_from_plain_string() {
        let body = r#"{"error":"model overloaded"}"#;
        assert_eq!(backend_error_message(503, body), "model overloaded");
    }

    #[test]
    fn leaked_key_is_rewritten() {
        let body = r#"{"error":{"message":"Your API key was reported as leaked."}}"#;
        assert!(backend_error_message(403, body).starts_with("API key issue detected"));
    }

    #[test]
    fn quota_is_rewritten() {
        let body = r#"{"error":{"message":"Resource has been exhausted (e.g. check quota)."}}"#;
        assert!(backend_error_message(429, body).starts_with("API quota exceeded"));
        assert!(backend_error_message(429, "not json").starts_with("API quota exceeded"));
    }

    #[test]
    fn non_json_body_uses_generic_message() {
        assert_eq!(backend_error_message(502, "<html>bad gateway</html>"), GENERIC_FAILURE);
    }
}
