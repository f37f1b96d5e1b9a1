//! Intent parsing and execution-rule compilation for IntentFlow.
//!
//! This crate provides:
//!
//! - **Pipeline**: AI-backed parsing with a deterministic fallback, via
//!   [`pipeline::IntentPipeline`].  It never fails on valid input.
//! - **Fallback parser**: an ordered keyword rule table, via
//!   [`fallback::LexicalParser`].
//! - **Extraction**: a chain of strategies that pull a JSON object out of
//!   noisy model output, via [`extract::extract`].
//! - **Rule compiler**: the versioned execution-rules document, the
//!   placeholder intent hash, and a SHA-256 rules digest, in [`rules`].
//! - **Market context**: optional price enrichment of the prompt, via
//!   [`enrich::MarketContext`].

pub mod config;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod pipeline;
pub mod prompt;
pub mod rules;
pub mod types;

pub use config::PipelineConfig;
pub use enrich::MarketContext;
pub use error::{IntentError, Result};
pub use extract::extract;
pub use fallback::{LexicalParser, parse_fallback};
pub use pipeline::{IntentPipeline, ParseOutcome};
pub use rules::{CompiledRules, ExecutionRules, compile, content_digest, generate_intent_hash};
pub use types::{Frequency, IntentFields, ParsedIntent};
