//! Extraction prompt and lenient response parsing.

use std::sync::LazyLock;

use regex::Regex;

use crate::planner::types::{Constraints, ExtractedEntities};

pub const MAX_INPUT_CHARS: usize = 4096;

pub const SYSTEM_PROMPT: &str = r#"You are a Solana transaction intent extractor. Given a user's natural language prompt describing a Solana blockchain action, extract the structured intent.

Return ONLY valid JSON matching this exact schema, with no markdown, no explanation, no extra text:

{
  "action_type": "swap" | "transfer" | "stake" | "unstake" | "lend" | "borrow" | "nft_buy" | "nft_sell" | "unknown",
  "tokens": [{ "ticker": "string", "role": "source" | "destination" }],
  "amounts": [{ "value": number, "ticker": "string" }],
  "destination": "optional base58 wallet address or null",
  "slippage_bps": "number or null",
  "priority_fee_lamports": "number or null",
  "protocol_preference": "string or null",
  "raw_confidence": 0.0 to 1.0
}

Rules:
- action_type must be one of the listed values. Use "unknown" if you cannot determine the action.
- tokens array lists each token mentioned with its role in the action.
- amounts array lists each amount mentioned. value must be a number (not a string).
- slippage_bps: convert percentages to basis points (1% = 100 bps).
- protocol_preference: extract if the user mentions a specific protocol (jupiter, raydium, sanctum, marinade, jito, tensor, pumpfun, marginfi, kamino).
- raw_confidence: your confidence that you correctly understood the intent (0.0 = no idea, 1.0 = certain).
- If the user's prompt contains multiple actions, extract only the FIRST action. Multi-step planning is handled downstream.
- NEVER invent or guess mint addresses. Only extract ticker symbols.
- Return ONLY the JSON object. No markdown code fences, no text before or after."#;

pub const RETRY_ASSISTANT_TURN: &str = "I apologize, let me return only the valid JSON object:";
pub const RETRY_USER_TURN: &str = "You returned invalid JSON on your previous attempt. Return ONLY the raw JSON object, no markdown, no explanation.";

static FENCED_JSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("fence pattern must compile")
});

/// First user turn: quoted, truncated prompt plus constraints as JSON.
pub fn build_user_message(prompt: &str, constraints: Option<&Constraints>) -> String {
    let truncated: String = prompt.chars().take(MAX_INPUT_CHARS).collect();
    let mut message = format!("User prompt: \"{truncated}\"");
    if let Some(constraints) = constraints {
        if let Ok(json) = serde_json::to_string(constraints) {
            message.push_str("\n\nUser constraints: ");
            message.push_str(&json);
        }
    }
    message
}

/// Raw JSON first, then the first fenced block.
pub fn parse_entities(text: &str) -> Option<ExtractedEntities> {
    let text = text.trim();
    if let Ok(entities) = serde_json::from_str(text) {
        return Some(entities);
    }
    let fenced = FENCED_JSON_RE.captures(text)?.get(1)?.as_str().trim();
    serde_json::from_str(fenced).ok()
}
