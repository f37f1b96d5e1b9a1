//! Lexical signal fallback parser.
//!
//! A deterministic keyword classifier that turns any text into a valid
//! [`ParsedIntent`].  It is used whenever the AI path is unavailable or
//! produces nothing usable.
//!
//! Each category is an independent [`KeywordRule`] in the ordered
//! [`RULES`] table.  Every rule whose keywords occur in the lower-cased text
//! contributes; contributions accumulate in table order and frequency/gas
//! overrides are last-writer-wins.  Adding a category means appending a
//! rule, never restructuring the others.
//!
//! Keyword membership is plain substring containment (so `"lp"` matches
//! inside `"help"`), evaluated in a single pass with an Aho-Corasick
//! automaton over the whole vocabulary.

use std::collections::{BTreeSet, HashSet};

use aho_corasick::AhoCorasick;

use crate::types::{DEFAULT_ACTION, DEFAULT_GAS, Frequency, IntentFields, ParsedIntent};

/// Risk warning emitted when no rule matched at all.
pub const UNRECOGNIZED_RISK_WARNING: &str = "Please review all actions before execution";

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

/// A keyword-triggered frequency (and optionally gas) override.
#[derive(Debug)]
pub struct FrequencyCue {
    pub keywords: &'static [&'static str],
    pub frequency: Frequency,
    pub gas: Option<&'static str>,
}

/// Extra actions added when a further keyword is present.
#[derive(Debug)]
pub struct Refinement {
    pub keywords: &'static [&'static str],
    pub actions: &'static [&'static str],
}

/// One keyword category and everything it contributes.
#[derive(Debug)]
pub struct KeywordRule {
    /// Category name, for logs.
    pub name: &'static str,
    /// Any of these (lower-case) substrings triggers the rule.
    pub keywords: &'static [&'static str],
    pub actions: &'static [&'static str],
    pub risk_warnings: &'static [&'static str],
    pub safety_constraints: &'static [&'static str],
    /// Unconditional frequency override.
    pub frequency: Option<Frequency>,
    /// Unconditional gas override.
    pub gas: Option<&'static str>,
    /// Keyword-dependent overrides; the first matching cue wins.
    pub cues: &'static [FrequencyCue],
    pub refinement: Option<Refinement>,
}

const fn rule(name: &'static str, keywords: &'static [&'static str]) -> KeywordRule {
    KeywordRule {
        name,
        keywords,
        actions: &[],
        risk_warnings: &[],
        safety_constraints: &[],
        frequency: None,
        gas: None,
        cues: &[],
        refinement: None,
    }
}

/// The category table, in evaluation order.
pub static RULES: &[KeywordRule] = &[
    KeywordRule {
        actions: &["Swap tokens via DEX", "Transfer tokens to wallet"],
        risk_warnings: &["Market volatility may affect investment value"],
        safety_constraints: &["Maximum 10% of wallet balance per transaction"],
        cues: &[
            FrequencyCue {
                keywords: &["weekly", "week", "monday"],
                frequency: Frequency::Weekly,
                gas: Some("0.02 MATIC"),
            },
            FrequencyCue {
                keywords: &["monthly", "month"],
                frequency: Frequency::Monthly,
                gas: Some("0.02 MATIC"),
            },
            FrequencyCue {
                keywords: &["daily", "day"],
                frequency: Frequency::Daily,
                gas: Some("0.05 MATIC"),
            },
        ],
        ..rule("investment", &["invest", "buy", "dca", "dollar-cost"])
    },
    KeywordRule {
        actions: &["Transfer tokens to recipient"],
        risk_warnings: &["Ensure recipient address is correct"],
        safety_constraints: &["Require confirmation before each transfer"],
        cues: &[
            FrequencyCue {
                keywords: &["monthly", "month", "1st"],
                frequency: Frequency::Monthly,
                gas: None,
            },
            FrequencyCue {
                keywords: &["weekly", "week"],
                frequency: Frequency::Weekly,
                gas: None,
            },
        ],
        ..rule("payment", &["pay", "send", "transfer", "donate"])
    },
    KeywordRule {
        actions: &["Deposit tokens to yield pool", "Monitor APY changes"],
        risk_warnings: &["APY rates may fluctuate"],
        safety_constraints: &["Auto-withdraw if APY drops below threshold"],
        refinement: Some(Refinement {
            keywords: &["highest", "best", "rotation"],
            actions: &["Compare APY rates across pools", "Switch to highest yield pool"],
        }),
        ..rule("yield", &["yield", "stake", "pool", "apy"])
    },
    KeywordRule {
        actions: &["Monitor token price", "Execute sell order if conditions met"],
        risk_warnings: &["Slippage may affect execution price"],
        safety_constraints: &["Minimum price threshold required"],
        frequency: Some(Frequency::Conditional),
        ..rule("stop_loss", &["stop", "loss", "sell", "price drops", "below"])
    },
    KeywordRule {
        actions: &["Monitor token price", "Execute sell order when target reached"],
        risk_warnings: &["Price may not reach target"],
        safety_constraints: &["Set realistic profit targets"],
        frequency: Some(Frequency::Conditional),
        ..rule("take_profit", &["profit", "target", "reaches", "price reaches"])
    },
    KeywordRule {
        actions: &[
            "Calculate current portfolio allocation",
            "Swap tokens to achieve target ratio",
        ],
        risk_warnings: &["Rebalancing may incur trading fees"],
        safety_constraints: &["Rebalance only when deviation exceeds threshold"],
        frequency: Some(Frequency::Conditional),
        gas: Some("0.05 MATIC"),
        ..rule("rebalancing", &["rebalance", "portfolio", "allocation"])
    },
    KeywordRule {
        actions: &["Add tokens to liquidity pool", "Monitor pool TVL and fees"],
        risk_warnings: &["Impermanent loss may occur"],
        safety_constraints: &["Monitor pool health regularly"],
        gas: Some("0.05 MATIC"),
        ..rule("liquidity", &["liquidity", "add liquidity", "lp"])
    },
    KeywordRule {
        actions: &["Batch multiple transactions", "Wait for optimal gas prices"],
        risk_warnings: &["Delayed execution may affect timing"],
        safety_constraints: &["Set maximum delay threshold"],
        ..rule("gas_optimization", &["gas", "batch", "optimize"])
    },
    KeywordRule {
        actions: &["Transfer to savings wallet"],
        risk_warnings: &["Ensure sufficient balance for operations"],
        safety_constraints: &["Maintain minimum operational balance"],
        ..rule("savings", &["save", "emergency", "savings"])
    },
    KeywordRule {
        actions: &["Submit transaction for approval", "Wait for required signatures"],
        risk_warnings: &["Transaction may be rejected by signers"],
        safety_constraints: &["Require minimum approval threshold"],
        frequency: Some(Frequency::Conditional),
        ..rule(
            "multisig",
            &["dao", "multi-sig", "proposal", "signer", "payroll"],
        )
    },
];

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Keyword classifier over a rule table.
///
/// Building the automaton is the only non-trivial cost, so construct one
/// parser and share it.
pub struct LexicalParser {
    rules: &'static [KeywordRule],
    vocabulary: Vec<&'static str>,
    automaton: Option<AhoCorasick>,
}

impl Default for LexicalParser {
    fn default() -> Self {
        Self::new(RULES)
    }
}

impl std::fmt::Debug for LexicalParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LexicalParser")
            .field("rules", &self.rules.len())
            .field("vocabulary", &self.vocabulary.len())
            .finish()
    }
}

impl LexicalParser {
    /// Create a parser over `rules`.
    pub fn new(rules: &'static [KeywordRule]) -> Self {
        let vocabulary: Vec<&'static str> = rules
            .iter()
            .flat_map(|r| {
                let cue_words = r.cues.iter().flat_map(|c| c.keywords.iter());
                let refinement_words = r.refinement.iter().flat_map(|x| x.keywords.iter());
                r.keywords.iter().chain(cue_words).chain(refinement_words)
            })
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let automaton = match AhoCorasick::new(&vocabulary) {
            Ok(ac) => {
                tracing::trace!(count = vocabulary.len(), "keyword automaton built");
                Some(ac)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to build keyword automaton, using linear scan");
                None
            }
        };

        Self {
            rules,
            vocabulary,
            automaton,
        }
    }

    /// Every vocabulary keyword that occurs in `lowered`.
    fn present_keywords(&self, lowered: &str) -> HashSet<&'static str> {
        match &self.automaton {
            Some(ac) => ac
                .find_overlapping_iter(lowered)
                .map(|m| self.vocabulary[m.pattern().as_usize()])
                .collect(),
            None => self
                .vocabulary
                .iter()
                .copied()
                .filter(|k| lowered.contains(k))
                .collect(),
        }
    }

    /// Classify `text` into structured fields (not yet normalized).
    pub fn classify(&self, text: &str) -> IntentFields {
        let lowered = text.to_lowercase();
        let present = self.present_keywords(&lowered);
        let any = |keywords: &[&str]| keywords.iter().any(|k| present.contains(k));

        let mut fields = IntentFields {
            estimated_gas: DEFAULT_GAS.to_owned(),
            ..IntentFields::default()
        };
        let mut matched: Vec<&'static str> = Vec::new();

        for rule in self.rules.iter().filter(|r| any(r.keywords)) {
            matched.push(rule.name);

            fields.actions.extend(rule.actions.iter().map(|s| (*s).to_owned()));
            fields
                .risk_warnings
                .extend(rule.risk_warnings.iter().map(|s| (*s).to_owned()));
            fields
                .safety_constraints
                .extend(rule.safety_constraints.iter().map(|s| (*s).to_owned()));

            if let Some(frequency) = rule.frequency {
                fields.frequency = frequency;
            }
            if let Some(gas) = rule.gas {
                fields.estimated_gas = gas.to_owned();
            }
            if let Some(cue) = rule.cues.iter().find(|c| any(c.keywords)) {
                fields.frequency = cue.frequency;
                if let Some(gas) = cue.gas {
                    fields.estimated_gas = gas.to_owned();
                }
            }
            if let Some(refinement) = rule.refinement.as_ref().filter(|x| any(x.keywords)) {
                fields
                    .actions
                    .extend(refinement.actions.iter().map(|s| (*s).to_owned()));
            }
        }

        if fields.actions.is_empty() {
            fields.actions.push(DEFAULT_ACTION.to_owned());
            fields
                .risk_warnings
                .push(UNRECOGNIZED_RISK_WARNING.to_owned());
        }

        tracing::debug!(
            categories = ?matched,
            frequency = %fields.frequency,
            gas = %fields.estimated_gas,
            "lexical classification"
        );

        fields
    }

    /// Parse `text` into a complete [`ParsedIntent`] flagged as fallback.
    pub fn parse(&self, text: &str) -> ParsedIntent {
        ParsedIntent::new(text, self.classify(text), true)
    }
}

/// Parse with the default rule table.
pub fn parse_fallback(text: &str) -> ParsedIntent {
    LexicalParser::default().parse(text)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DEFAULT_RISK_WARNING, DEFAULT_SAFETY_CONSTRAINT};

    #[test]
    fn dca_weekly() {
        let parsed = parse_fallback("Invest 100 USDC into ETH every Monday");
        assert_eq!(
            parsed.actions,
            vec!["Swap tokens via DEX", "Transfer tokens to wallet"]
        );
        assert_eq!(parsed.frequency, Frequency::Weekly);
        assert_eq!(parsed.estimated_gas, "0.02 MATIC");
        assert!(parsed.used_fallback);
        assert_eq!(parsed.intent, "Invest 100 USDC into ETH every Monday");
    }

    #[test]
    fn stop_loss_is_conditional() {
        let parsed = parse_fallback("Sell my ETH if price drops below $2000");
        assert_eq!(parsed.frequency, Frequency::Conditional);
        assert!(parsed.actions.contains(&"Monitor token price".to_string()));
        assert!(
            parsed
                .actions
                .contains(&"Execute sell order if conditions met".to_string())
        );
        assert_eq!(parsed.estimated_gas, "0.01 MATIC");
    }

    #[test]
    fn monthly_payment() {
        let parsed = parse_fallback("Send 20 USDC to 0x742d every month");
        assert_eq!(parsed.actions, vec!["Transfer tokens to recipient"]);
        assert_eq!(parsed.frequency, Frequency::Monthly);
        assert_eq!(parsed.estimated_gas, "0.01 MATIC");
    }

    #[test]
    fn payment_on_the_first_is_monthly() {
        let parsed = parse_fallback("Pay rent on the 1st");
        assert_eq!(parsed.frequency, Frequency::Monthly);
    }

    #[test]
    fn daily_dca_costs_more_gas() {
        let parsed = parse_fallback("DCA into BTC daily");
        assert_eq!(parsed.frequency, Frequency::Daily);
        assert_eq!(parsed.estimated_gas, "0.05 MATIC");
    }

    #[test]
    fn yield_rotation_adds_comparison_actions() {
        let parsed = parse_fallback("Move USDC to the highest APY pool");
        assert_eq!(
            parsed.actions,
            vec![
                "Deposit tokens to yield pool",
                "Monitor APY changes",
                "Compare APY rates across pools",
                "Switch to highest yield pool",
            ]
        );
        assert_eq!(parsed.frequency, Frequency::OneTime);
    }

    #[test]
    fn groups_accumulate_in_table_order() {
        let parsed = parse_fallback("Buy ETH weekly and rebalance my portfolio");
        assert_eq!(
            parsed.actions,
            vec![
                "Swap tokens via DEX",
                "Transfer tokens to wallet",
                "Calculate current portfolio allocation",
                "Swap tokens to achieve target ratio",
            ]
        );
        // Rebalancing evaluates later, so it overrides both frequency and gas.
        assert_eq!(parsed.frequency, Frequency::Conditional);
        assert_eq!(parsed.estimated_gas, "0.05 MATIC");
    }

    #[test]
    fn later_cue_overrides_earlier_frequency() {
        // Investment sets Weekly, payment's "month" cue then sets Monthly.
        let parsed = parse_fallback("Buy ETH weekly and send the rest every month");
        assert_eq!(parsed.frequency, Frequency::Monthly);
        assert_eq!(parsed.estimated_gas, "0.02 MATIC");
    }

    #[test]
    fn dao_payroll_matches_payment_and_multisig() {
        let parsed = parse_fallback("Run DAO payroll");
        assert!(parsed.actions.contains(&"Transfer tokens to recipient".to_string()));
        assert!(parsed.actions.contains(&"Wait for required signatures".to_string()));
        assert_eq!(parsed.frequency, Frequency::Conditional);
    }

    #[test]
    fn substring_membership_is_literal() {
        // "lp" inside "help" triggers the liquidity rule.
        let parsed = parse_fallback("help");
        assert_eq!(
            parsed.actions,
            vec!["Add tokens to liquidity pool", "Monitor pool TVL and fees"]
        );
        assert_eq!(parsed.estimated_gas, "0.05 MATIC");
    }

    #[test]
    fn unrecognized_text_gets_defaults() {
        let parsed = parse_fallback("hello world");
        assert_eq!(parsed.actions, vec![DEFAULT_ACTION]);
        assert_eq!(parsed.risk_warnings, vec![UNRECOGNIZED_RISK_WARNING]);
        assert_eq!(parsed.safety_constraints, vec![DEFAULT_SAFETY_CONSTRAINT]);
        assert_eq!(parsed.frequency, Frequency::OneTime);
        assert_eq!(parsed.estimated_gas, DEFAULT_GAS);
        assert!(parsed.satisfies_invariants());
    }

    #[test]
    fn empty_text_is_still_valid() {
        let parsed = parse_fallback("");
        assert!(parsed.satisfies_invariants());
        assert_ne!(parsed.risk_warnings, vec![DEFAULT_RISK_WARNING]);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(
            parse_fallback("INVEST WEEKLY"),
            parse_fallback("invest weekly").with_intent("INVEST WEEKLY")
        );
    }

    #[test]
    fn deterministic() {
        let text = "Stake MATIC rewards weekly and take profit when ETH reaches $4000";
        assert_eq!(parse_fallback(text), parse_fallback(text));
    }

    #[test]
    fn linear_scan_agrees_with_automaton() {
        let parser = LexicalParser::default();
        let scan = LexicalParser {
            rules: RULES,
            vocabulary: parser.vocabulary.clone(),
            automaton: None,
        };
        for text in [
            "Invest 100 USDC into ETH every Monday",
            "Sell my ETH if price drops below $2000",
            "add liquidity and optimize gas with batch proposals",
        ] {
            assert_eq!(parser.classify(text), scan.classify(text));
        }
    }

    impl ParsedIntent {
        fn with_intent(mut self, intent: &str) -> Self {
            self.intent = intent.to_owned();
            self
        }
    }
}
