//! AI completion layer for IntentFlow.
//!
//! This crate talks to the generative text backend that turns a natural
//! language intent into structured JSON.  It deliberately knows nothing about
//! intents themselves; it only moves prompts out and raw text back in.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────┐     ┌───────────────────┐
//! │  ModelChain  │────>│ RetryPolicy │────>│ CompletionBackend │
//! │ (which model)│     │ (how often) │     │   (GeminiClient)  │
//! └──────────────┘     └─────────────┘     └───────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`llm`] -- Backend trait, Gemini client, retry policy, model chain.
//! - [`error`] -- Agent error types.

pub mod error;
pub mod llm;

// Re-export the most commonly used types at the crate root.
pub use error::{AgentError, Result};
pub use llm::{
    Completion, CompletionBackend, CompletionRequest, GeminiClient, GeminiClientConfig,
    ModelChain, RetryPolicy, complete_with_fallback,
};
