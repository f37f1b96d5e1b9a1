//! JSON extraction from AI completions.
//!
//! Models wrap their JSON in markdown fences, prepend prose, or append
//! commentary.  [`extract`] runs an ordered chain of increasingly permissive
//! [`ExtractionStrategy`] implementations; the first one that yields an
//! object with a usable `actions` list wins.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{IntentError, Result};
use crate::types::{Frequency, GAS_TOKEN, IntentFields};

/// Objects with at most one level of nesting.
static FLAT_OBJECT: LazyLock<Option<Regex>> =
    LazyLock::new(|| match Regex::new(r"\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}") {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(error = %e, "flat object pattern failed to compile");
            None
        }
    });

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// One way of locating JSON object candidates inside raw model text.
pub trait ExtractionStrategy: Send + Sync {
    /// Strategy name, for logs.
    fn name(&self) -> &'static str;

    /// Candidate JSON texts, most likely first.
    fn candidates<'a>(&self, raw: &'a str) -> Vec<std::borrow::Cow<'a, str>>;
}

/// Strip code fences and parse what remains.
#[derive(Debug, Default, Clone, Copy)]
pub struct FencedOrDirect;

impl ExtractionStrategy for FencedOrDirect {
    fn name(&self) -> &'static str {
        "fenced_or_direct"
    }

    fn candidates<'a>(&self, raw: &'a str) -> Vec<std::borrow::Cow<'a, str>> {
        let trimmed = raw.trim();
        if !trimmed.contains("```") {
            return vec![trimmed.into()];
        }
        let stripped = trimmed
            .replace("```json", "")
            .replace("```JSON", "")
            .replace("```", "");
        vec![stripped.trim().to_owned().into()]
    }
}

/// The span from the first `{` to the last `}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OutermostBraces;

impl ExtractionStrategy for OutermostBraces {
    fn name(&self) -> &'static str {
        "outermost_braces"
    }

    fn candidates<'a>(&self, raw: &'a str) -> Vec<std::borrow::Cow<'a, str>> {
        match (raw.find('{'), raw.rfind('}')) {
            (Some(start), Some(end)) if end > start => vec![(&raw[start..=end]).into()],
            _ => Vec::new(),
        }
    }
}

/// Every shallow object match, in order of appearance.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatObject;

impl ExtractionStrategy for FlatObject {
    fn name(&self) -> &'static str {
        "flat_object"
    }

    fn candidates<'a>(&self, raw: &'a str) -> Vec<std::borrow::Cow<'a, str>> {
        match FLAT_OBJECT.as_ref() {
            Some(re) => re.find_iter(raw).map(|m| m.as_str().into()).collect(),
            None => Vec::new(),
        }
    }
}

/// The default strategy chain, in evaluation order.
pub fn default_strategies() -> Vec<Box<dyn ExtractionStrategy>> {
    vec![
        Box::new(FencedOrDirect),
        Box::new(OutermostBraces),
        Box::new(FlatObject),
    ]
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract intent fields from raw model text with the default chain.
pub fn extract(raw: &str) -> Result<IntentFields> {
    extract_with(&default_strategies(), raw)
}

/// Extract intent fields from raw model text with a custom chain.
///
/// Returns [`IntentError::MissingActions`] if some candidate parsed as an
/// object but none carried actions, and [`IntentError::ExtractionFailed`]
/// if no candidate parsed at all.
pub fn extract_with(strategies: &[Box<dyn ExtractionStrategy>], raw: &str) -> Result<IntentFields> {
    let mut saw_object = false;

    for strategy in strategies {
        for candidate in strategy.candidates(raw) {
            let value = match serde_json::from_str::<Value>(&candidate) {
                Ok(v) if v.is_object() => v,
                Ok(_) => continue,
                Err(e) => {
                    tracing::trace!(strategy = strategy.name(), error = %e, "candidate rejected");
                    continue;
                }
            };
            saw_object = true;
            match fields_from_value(&value) {
                Ok(fields) => {
                    tracing::debug!(
                        strategy = strategy.name(),
                        actions = fields.actions.len(),
                        "extracted intent fields"
                    );
                    return Ok(fields);
                }
                Err(e) => {
                    tracing::debug!(strategy = strategy.name(), error = %e, "object lacks actions");
                }
            }
        }
    }

    if saw_object {
        return Err(IntentError::MissingActions);
    }

    let preview: String = raw.chars().take(200).collect();
    tracing::warn!(preview = %preview, "no JSON object found in AI response");
    Err(IntentError::ExtractionFailed {
        reason: "no JSON object found".into(),
    })
}

/// Validate and normalize a decoded JSON object.
///
/// `actions` must be a non-empty array with at least one non-blank string;
/// non-string entries are skipped.  Optional fields that are missing, empty
/// or of the wrong type take their defaults.
pub fn fields_from_value(value: &Value) -> Result<IntentFields> {
    let actions = string_list(value.get("actions"));
    if actions.is_empty() {
        return Err(IntentError::MissingActions);
    }

    let frequency = value
        .get("frequency")
        .and_then(Value::as_str)
        .and_then(Frequency::parse_label)
        .unwrap_or_default();

    let estimated_gas = match value.get("estimatedGas") {
        Some(Value::String(s)) => s.trim().to_owned(),
        Some(Value::Number(n)) => format!("{n} {GAS_TOKEN}"),
        _ => String::new(),
    };

    let fields = IntentFields {
        actions,
        frequency,
        risk_warnings: string_list(value.get("riskWarnings")),
        safety_constraints: string_list(value.get("safetyConstraints")),
        estimated_gas,
    };
    Ok(fields.normalized())
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
