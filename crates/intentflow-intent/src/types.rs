//! Intent data model.
//!
//! [`IntentFields`] is what both parsing paths produce; [`ParsedIntent`] is
//! the record that leaves the pipeline, with the execution rules compiled
//! in.  Both paths go through [`IntentFields::normalized`], so a consumer
//! cannot tell the shape of an AI result from a fallback result.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rules;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Native gas token symbol used in gas estimates.
pub const GAS_TOKEN: &str = "MATIC";

/// Gas estimate used when nothing better is known.
pub const DEFAULT_GAS: &str = "0.01 MATIC";

/// Action used when nothing could be recognised.
pub const DEFAULT_ACTION: &str = "Process intent based on user instructions";

/// Risk warning used when none was produced.
pub const DEFAULT_RISK_WARNING: &str = "Standard execution risks apply";

/// Safety constraint used when none was produced.
pub const DEFAULT_SAFETY_CONSTRAINT: &str = "Standard safety protocols";

// ---------------------------------------------------------------------------
// Frequency
// ---------------------------------------------------------------------------

/// How often an intent should execute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    Weekly,
    Monthly,
    Daily,
    #[default]
    #[serde(rename = "One-time")]
    OneTime,
    /// Triggered by a market condition rather than the calendar.
    Conditional,
}

impl Frequency {
    /// The wire label (`"Weekly"`, `"One-time"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
            Self::Daily => "Daily",
            Self::OneTime => "One-time",
            Self::Conditional => "Conditional",
        }
    }

    /// Lenient parse of a frequency label produced by a model.
    ///
    /// Case and surrounding whitespace are ignored.  Returns `None` for
    /// blank or unrecognised labels so the caller can apply the default.
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "daily" => Some(Self::Daily),
            "one-time" | "one time" | "onetime" | "once" => Some(Self::OneTime),
            "conditional" => Some(Self::Conditional),
            _ => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// The structured content of an intent, before rule compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentFields {
    pub actions: Vec<String>,
    pub frequency: Frequency,
    pub risk_warnings: Vec<String>,
    pub safety_constraints: Vec<String>,
    pub estimated_gas: String,
}

impl IntentFields {
    /// Fill every empty field with its documented default.
    pub fn normalized(mut self) -> Self {
        if self.actions.is_empty() {
            self.actions.push(DEFAULT_ACTION.to_owned());
        }
        if self.risk_warnings.is_empty() {
            self.risk_warnings.push(DEFAULT_RISK_WARNING.to_owned());
        }
        if self.safety_constraints.is_empty() {
            self.safety_constraints
                .push(DEFAULT_SAFETY_CONSTRAINT.to_owned());
        }
        if self.estimated_gas.trim().is_empty() {
            self.estimated_gas = DEFAULT_GAS.to_owned();
        }
        self
    }
}

// ---------------------------------------------------------------------------
// ParsedIntent
// ---------------------------------------------------------------------------

/// The canonical output of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedIntent {
    /// The original raw text, verbatim.
    pub intent: String,
    pub actions: Vec<String>,
    pub frequency: Frequency,
    pub risk_warnings: Vec<String>,
    pub safety_constraints: Vec<String>,
    pub estimated_gas: String,
    /// Serialized, versioned execution-rules document.
    pub execution_rules: String,
    /// `true` iff the lexical fallback parser produced this record.
    pub used_fallback: bool,
}

impl ParsedIntent {
    /// Normalize `fields`, compile their execution rules, and assemble the
    /// record.
    pub fn new(intent: impl Into<String>, fields: IntentFields, used_fallback: bool) -> Self {
        let fields = fields.normalized();
        let execution_rules = rules::compile(&fields).execution_rules;
        Self {
            intent: intent.into(),
            actions: fields.actions,
            frequency: fields.frequency,
            risk_warnings: fields.risk_warnings,
            safety_constraints: fields.safety_constraints,
            estimated_gas: fields.estimated_gas,
            execution_rules,
            used_fallback,
        }
    }

    /// The structured fields of this record.
    pub fn fields(&self) -> IntentFields {
        IntentFields {
            actions: self.actions.clone(),
            frequency: self.frequency,
            risk_warnings: self.risk_warnings.clone(),
            safety_constraints: self.safety_constraints.clone(),
            estimated_gas: self.estimated_gas.clone(),
        }
    }

    /// Whether every non-emptiness guarantee holds.
    pub fn satisfies_invariants(&self) -> bool {
        !self.actions.is_empty()
            && !self.risk_warnings.is_empty()
            && !self.safety_constraints.is_empty()
            && !self.estimated_gas.trim().is_empty()
            && !self.execution_rules.is_empty()
    }

    /// Restore the non-emptiness guarantees if anything broke them,
    /// recompiling the rules from the repaired fields.
    pub fn ensure_invariants(&mut self) {
        if self.satisfies_invariants() {
            return;
        }
        tracing::warn!(intent = %self.intent, "parsed intent violated invariants, repairing");
        let repaired = Self::new(self.intent.clone(), self.fields(), self.used_fallback);
        *self = repaired;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
