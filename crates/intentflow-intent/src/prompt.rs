//! Prompt construction for the AI parsing path.

/// Instructions describing the extraction task and the JSON contract.
pub const SYSTEM_PROMPT: &str = r#"You are an expert assistant that parses user intentions for on-chain automation on the Polygon blockchain.
Analyze ANY user input and extract structured information for automation.

EXTRACT THE FOLLOWING:
1. Actions: specific blockchain actions (e.g. "Swap tokens", "Transfer tokens", "Deposit to pool", "Stake tokens", "Withdraw from pool", "Execute sell order", "Add liquidity", "Rebalance portfolio")
2. Frequency: one of "Weekly", "Monthly", "Daily", "One-time", or "Conditional" (for price-based triggers)
3. Risk Warnings: potential risks (market volatility, slippage, smart contract risks, ...)
4. Safety Constraints: safety measures (maximum amounts, price thresholds, confirmation requirements, ...)
5. Estimated Gas: gas cost in MATIC, formatted like "0.02 MATIC"

EXAMPLES:
- DCA: "Invest 100 USDC into ETH every Monday" -> actions: ["Swap USDC to ETH"], frequency: "Weekly"
- Payments: "Send 20 USDC to 0x742d... every month" -> actions: ["Transfer USDC"], frequency: "Monthly"
- Stop-loss: "Sell my ETH if price drops below $2000" -> actions: ["Monitor price", "Execute sell order"], frequency: "Conditional"
- Rebalancing: "Rebalance portfolio to 60% ETH and 40% USDC" -> actions: ["Calculate allocation", "Swap tokens to target ratio"], frequency: "Conditional"
- Yield: "Move USDC to highest APY pool" -> actions: ["Compare APY rates", "Withdraw from current pool", "Deposit to new pool"], frequency: "Weekly"
- Staking: "Stake MATIC rewards weekly" -> actions: ["Claim rewards", "Stake tokens"], frequency: "Weekly"

Return ONLY valid JSON with exactly this structure (no markdown, no code blocks):
{
  "actions": ["action1", "action2"],
  "frequency": "Weekly|Monthly|Daily|One-time|Conditional",
  "riskWarnings": ["warning1", "warning2"],
  "safetyConstraints": ["constraint1", "constraint2"],
  "estimatedGas": "0.XX MATIC"
}

Gas estimates: simple transfers 0.01 MATIC, swaps 0.02-0.05 MATIC, complex operations 0.05+ MATIC."#;

const OUTPUT_REMINDER: &str = "CRITICAL: Return ONLY a valid JSON object. No markdown, no code blocks, \
no explanations. Just the raw JSON starting with { and ending with }.";

/// The per-request part of the prompt.
pub fn user_prompt(user_input: &str) -> String {
    format!(
        "Parse this user intent for on-chain automation: \"{user_input}\"\n\n\
         Extract all relevant information and return the JSON structure as specified."
    )
}

/// Join the (possibly enriched) system prompt with the user's intent.
pub fn assemble(system: &str, user_input: &str) -> String {
    format!("{system}\n\n{}\n\n{OUTPUT_REMINDER}", user_prompt(user_input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembled_prompt_quotes_input_and_ends_with_reminder() {
        let prompt = assemble(SYSTEM_PROMPT, "Invest 100 USDC into ETH every Monday");
        assert!(prompt.starts_with(SYSTEM_PROMPT));
        assert!(prompt.contains("\"Invest 100 USDC into ETH every Monday\""));
        assert!(prompt.ends_with(OUTPUT_REMINDER));
    }

    #[test]
    fn system_prompt_names_every_field() {
        for field in ["actions", "frequency", "riskWarnings", "safetyConstraints", "estimatedGas"] {
            assert!(SYSTEM_PROMPT.contains(field), "missing {field}");
        }
    }
}
