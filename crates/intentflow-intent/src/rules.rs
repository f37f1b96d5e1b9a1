//! Execution-rule compilation and intent hashing.
//!
//! The execution-rules document is what gets anchored on chain, so its
//! serialization is byte-stable: keys always appear in the order
//! `frequency, actions, conditions, constraints, version`.

use ring::digest::{SHA256, digest};
use serde::{Deserialize, Serialize};

use crate::types::{Frequency, IntentFields};

/// Current execution-rules schema version.  Bump on any breaking change.
pub const RULES_VERSION: &str = "1.0";

/// Length of the placeholder intent hash, in hex characters.
const INTENT_HASH_HEX_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// The versioned execution-rules document.
///
/// `conditions` is reserved for structured trigger expressions and is always
/// empty in schema 1.0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRules {
    pub frequency: Frequency,
    pub actions: Vec<String>,
    pub conditions: Vec<String>,
    pub constraints: Vec<String>,
    pub version: String,
}

/// A compiled document together with its canonical serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRules {
    pub document: ExecutionRules,
    pub execution_rules: String,
}

impl CompiledRules {
    /// SHA-256 digest of the canonical serialization.
    pub fn digest(&self) -> String {
        content_digest(&self.execution_rules)
    }
}

/// Compile normalized fields into the execution-rules document.
pub fn compile(fields: &IntentFields) -> CompiledRules {
    let document = ExecutionRules {
        frequency: fields.frequency,
        actions: fields.actions.clone(),
        conditions: Vec::new(),
        constraints: fields.safety_constraints.clone(),
        version: RULES_VERSION.to_owned(),
    };

    let execution_rules = match serde_json::to_string(&document) {
        Ok(s) => s,
        Err(e) => {
            // Unreachable for a struct of strings.
            tracing::error!(error = %e, "execution rules serialization failed");
            serde_json::json!({
                "frequency": document.frequency.as_str(),
                "actions": [],
                "conditions": [],
                "constraints": [],
                "version": RULES_VERSION,
            })
            .to_string()
        }
    };

    CompiledRules {
        document,
        execution_rules,
    }
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Provisional on-chain identifier for an intent.
///
/// `0x` followed by the hex encoding of `"{intent}-{timestamp_ms}"`,
/// truncated to 64 hex characters.  This is **not** a cryptographic digest:
/// it depends on the submission time and long intents sharing a prefix
/// collide.  Use [`content_digest`] when a content address is needed.
pub fn generate_intent_hash(intent: &str, timestamp_ms: i64) -> String {
    let payload = format!("{intent}-{timestamp_ms}");
    let hex = to_hex(payload.as_bytes());
    let end = hex.len().min(INTENT_HASH_HEX_LEN);
    format!("0x{}", &hex[..end])
}

/// `0x`-prefixed SHA-256 of the canonical execution-rules bytes.
pub fn content_digest(execution_rules: &str) -> String {
    let hash = digest(&SHA256, execution_rules.as_bytes());
    format!("0x{}", to_hex(hash.as_ref()))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
