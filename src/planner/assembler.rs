//! Turns a validation result into the final action plan.

use std::collections::BTreeMap;

use super::risk::classify_risk;
use super::types::{
    ActionPlan, ActionStep, ActionType, EntitySummary, ExtractedEntities, NATIVE_TICKER,
    RiskLevel, SOL_MINT, StepInputs, StepOutputs, TokenInput, TokenOutput, TokenRole,
    ValidationResult,
};
use super::validator::LOW_CONFIDENCE_THRESHOLD;

/// Venue for an action given the caller's stated preference.
pub fn resolve_protocol_hint(
    action_type: ActionType,
    preference: Option<&str>,
) -> Option<&'static str> {
    let preference = preference.map(str::to_ascii_lowercase);
    let preference = preference.as_deref();
    match action_type {
        ActionType::Swap => match preference {
            Some("raydium") => Some("raydium"),
            Some("pump" | "pumpfun" | "pumpswap") => Some("pumpswap"),
            _ => Some("jupiter"),
        },
        ActionType::Transfer => None,
        ActionType::Stake | ActionType::Unstake => match preference {
            Some("marinade") => Some("marinade"),
            Some("jito") => Some("jito"),
            _ => Some("sanctum"),
        },
        ActionType::Lend | ActionType::Borrow => match preference {
            Some("marginfi") => Some("marginfi"),
            Some("kamino") => Some("kamino"),
            _ => None,
        },
        ActionType::NftBuy | ActionType::NftSell => match preference {
            Some("tensor") => Some("tensor"),
            _ => None,
        },
        ActionType::Unknown => None,
    }
}

/// Data that must still be fetched before the step could execute.
pub fn required_data(action_type: ActionType, protocol_hint: Option<&str>) -> Vec<String> {
    let items: &[&str] = match action_type {
        ActionType::Swap if protocol_hint == Some("jupiter") => &["jupiter_quote"],
        ActionType::Swap => &["quote"],
        ActionType::Transfer => &["recipient_account_check"],
        ActionType::Stake | ActionType::Unstake => &["validator_info"],
        ActionType::Lend | ActionType::Borrow => &["protocol_rates"],
        ActionType::NftBuy | ActionType::NftSell => &["nft_listing_info"],
        ActionType::Unknown => &[],
    };
    items.iter().map(|item| item.to_string()).collect()
}

pub fn assemble_plan(validation: &ValidationResult) -> ActionPlan {
    let entities = &validation.entities;
    let protocol_hint =
        resolve_protocol_hint(entities.action_type, entities.protocol_preference.as_deref());
    let risk_level = classify_risk(
        entities.action_type,
        &validation.safety_flags,
        &validation.user_confirmations_needed,
    );

    let step = build_step(1, protocol_hint, validation);

    let mints: BTreeMap<String, String> = validation
        .resolved_tokens
        .iter()
        .map(|(ticker, entry)| (ticker.clone(), entry.mint.clone()))
        .collect();

    ActionPlan {
        intent: intent_sentence(entities, protocol_hint),
        action_plan: vec![step],
        extracted_entities: EntitySummary {
            amounts: entities.amounts.clone(),
            tickers: entities
                .tokens
                .iter()
                .map(|token| token.ticker.to_ascii_uppercase())
                .collect(),
            mints,
            slippage_bps: entities.slippage_bps,
            priority_fee: entities.priority_fee_lamports,
            destinations: entities.destination.iter().cloned().collect(),
        },
        feasibility: validation.feasibility,
        risk_level,
        reasons: reasons(validation, protocol_hint, risk_level),
        share_text: share_text(entities, protocol_hint),
    }
}

fn build_step(step: u32, protocol_hint: Option<&str>, validation: &ValidationResult) -> ActionStep {
    let entities = &validation.entities;
    let mint_of = |ticker: &str| validation.resolve(ticker).map(|entry| entry.mint.clone());
    let amount_of = |ticker: &str| entities.amount_for(ticker).map(|amount| amount.value);
    let first_amount = entities.amounts.first().map(|amount| amount.value);

    let (inputs, outputs) = match entities.action_type {
        ActionType::Swap => {
            let source = entities.token_with_role(TokenRole::Source);
            let destination = entities.token_with_role(TokenRole::Destination);
            let inputs = StepInputs::Swap {
                input_token: TokenInput {
                    ticker: source.map(|t| t.ticker.to_ascii_uppercase()),
                    mint: source.and_then(|t| mint_of(&t.ticker)),
                    amount: source.and_then(|t| amount_of(&t.ticker)),
                },
                slippage_bps: entities.slippage_bps,
            };
            let outputs = StepOutputs::Swap {
                output_token: TokenOutput {
                    ticker: destination.map(|t| t.ticker.to_ascii_uppercase()),
                    mint: destination.and_then(|t| mint_of(&t.ticker)),
                    amount_estimate: None,
                },
            };
            (inputs, outputs)
        }
        ActionType::Transfer => {
            let source = entities.token_with_role(TokenRole::Source);
            let inputs = StepInputs::Transfer {
                token: TokenInput {
                    ticker: source.map(|t| t.ticker.to_ascii_uppercase()),
                    mint: source.and_then(|t| mint_of(&t.ticker)),
                    amount: first_amount,
                },
                destination: entities.destination.clone(),
            };
            (inputs, StepOutputs::Empty {})
        }
        ActionType::Stake | ActionType::Unstake => {
            let inputs = StepInputs::Stake {
                token: TokenInput {
                    ticker: Some(NATIVE_TICKER.to_string()),
                    mint: Some(SOL_MINT.to_string()),
                    amount: first_amount,
                },
            };
            (inputs, StepOutputs::Empty {})
        }
        _ => {
            let mut source = None;
            let mut destination = None;
            for token in &entities.tokens {
                let slot = TokenInput {
                    ticker: Some(token.ticker.to_ascii_uppercase()),
                    mint: mint_of(&token.ticker),
                    amount: amount_of(&token.ticker),
                };
                match token.role {
                    TokenRole::Source => source = Some(slot),
                    TokenRole::Destination => destination = Some(slot),
                }
            }
            (StepInputs::ByRole { source, destination }, StepOutputs::Empty {})
        }
    };

    ActionStep {
        step,
        step_type: entities.action_type,
        protocol_hint: protocol_hint.map(str::to_string),
        inputs,
        outputs,
        required_data: required_data(entities.action_type, protocol_hint),
        safety_flags: validation.safety_flags.clone(),
        user_confirmations_needed: validation.user_confirmations_needed.clone(),
    }
}

fn reasons(
    validation: &ValidationResult,
    protocol_hint: Option<&str>,
    risk_level: RiskLevel,
) -> Vec<String> {
    let entities = &validation.entities;
    let mut reasons = Vec::new();

    let known = validation.resolved_tokens.len();
    if known > 0 && known == entities.tokens.len() {
        reasons.push("Well-known tokens".to_string());
    }
    if !entities.amounts.is_empty() {
        reasons.push("Explicit amount provided".to_string());
    }
    if entities.slippage_bps.is_some() {
        reasons.push("Explicit slippage provided".to_string());
    }
    if let Some(hint) = protocol_hint {
        reasons.push(format!("Standard {hint} {}", entities.action_type));
    }

    for flag in &validation.safety_flags {
        if let Some(ticker) = flag.strip_prefix("unknown_token:") {
            reasons.push(format!("Unknown token: {ticker}"));
        } else if let Some(ticker) = flag.strip_prefix("denylisted_token:") {
            reasons.push(format!("Denylisted token: {ticker}"));
        } else if flag == "invalid_destination" {
            reasons.push("Invalid destination address".to_string());
        }
    }

    if entities.raw_confidence < LOW_CONFIDENCE_THRESHOLD {
        reasons.push("Low extraction confidence".to_string());
    }
    if risk_level == RiskLevel::High && reasons.is_empty() {
        reasons.push("Action type could not be determined".to_string());
    }
    reasons
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn destination_ticker(entities: &ExtractedEntities) -> Option<&str> {
    entities
        .token_with_role(TokenRole::Destination)
        .map(|token| token.ticker.as_str())
        .filter(|ticker| !ticker.is_empty())
}

fn intent_sentence(entities: &ExtractedEntities, protocol_hint: Option<&str>) -> String {
    let action = entities.action_type;
    let via = protocol_hint
        .map(|hint| format!(" via {}", capitalize(hint)))
        .unwrap_or_default();
    let first = entities.amounts.first();

    match (action, first) {
        (ActionType::Swap, Some(amount)) => format!(
            "Swap {} {} → {}{via}",
            amount.value,
            amount.ticker.to_ascii_uppercase(),
            destination_ticker(entities)
                .map(str::to_ascii_uppercase)
                .unwrap_or_else(|| "?".to_string()),
        ),
        (ActionType::Transfer, Some(amount)) => {
            let to = entities
                .destination
                .as_deref()
                .map(|dest| format!(" to {}...", dest.chars().take(8).collect::<String>()))
                .unwrap_or_default();
            format!(
                "Transfer {} {}{to}",
                amount.value,
                amount.ticker.to_ascii_uppercase()
            )
        }
        (ActionType::Stake | ActionType::Unstake, _) => {
            let amount = first
                .map(|amount| format!(" {} {NATIVE_TICKER}", amount.value))
                .unwrap_or_default();
            format!("{}{amount}{via}", capitalize(action.as_str()))
        }
        _ => format!("{} action", capitalize(action.as_str())),
    }
}

fn share_text(entities: &ExtractedEntities, protocol_hint: Option<&str>) -> String {
    let action = entities.action_type;
    let via = protocol_hint
        .map(|hint| format!(" via {hint}"))
        .unwrap_or_default();
    let first = entities.amounts.first();

    match (action, first) {
        (ActionType::Swap, Some(amount)) => format!(
            "I asked an AI to plan my Solana swap in plain English — {} {} → {}{via}, no code needed",
            amount.value,
            amount.ticker,
            destination_ticker(entities).unwrap_or("?"),
        ),
        (ActionType::Transfer, Some(amount)) => format!(
            "I just planned a {} {} transfer on Solana using plain English",
            amount.value, amount.ticker
        ),
        (ActionType::Stake | ActionType::Unstake, _) => {
            let amount = first
                .map(|amount| format!("{} {NATIVE_TICKER} ", amount.value))
                .unwrap_or_default();
            format!("I planned a {amount}{action}{via} on Solana using plain English")
        }
        _ => format!("I used an AI to plan a Solana {action} action in plain English"),
    }
}
