//! LLM integration layer.
//!
//! - [`types`] -- Request/response types and the [`CompletionBackend`] trait.
//! - [`client`] -- HTTP client for the Gemini `generateContent` API.
//! - [`retry`] -- Exponential-backoff retry policy.
//! - [`router`] -- Ordered model chain and the composed completion call.

pub mod client;
pub mod retry;
pub mod router;
pub mod types;

// Re-export the most commonly used types for convenience.
pub use client::{GeminiClient, GeminiClientConfig};
pub use retry::RetryPolicy;
pub use router::{ModelChain, complete_with_fallback};
pub use types::{Completion, CompletionBackend, CompletionRequest};
