//! Entity validation against the token registry and caller constraints.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use super::types::{ActionType, Constraints, ExtractedEntities, Feasibility, ValidationResult};
use crate::tokens::{Resolution, TokenRegistry};

static SOLANA_ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$").expect("address pattern must compile")
});

pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Base58 shape check, 32 to 44 characters.
pub fn is_valid_solana_address(candidate: &str) -> bool {
    SOLANA_ADDRESS_RE.is_match(candidate)
}

struct Findings {
    flags: Vec<String>,
    confirmations: Vec<String>,
    feasibility: Feasibility,
}

impl Findings {
    fn downgrade(&mut self, to: Feasibility) {
        self.feasibility = self.feasibility.join_down(to);
    }

    fn confirm(&mut self, message: String, to: Feasibility) {
        self.confirmations.push(message);
        self.downgrade(to);
    }
}

/// Run every validation check in its fixed order.
pub fn validate_entities(
    mut entities: ExtractedEntities,
    constraints: Option<&Constraints>,
    registry: &TokenRegistry,
) -> ValidationResult {
    let default_constraints = Constraints::default();
    let constraints = constraints.unwrap_or(&default_constraints);

    let mut findings = Findings {
        flags: Vec::new(),
        confirmations: Vec::new(),
        feasibility: Feasibility::High,
    };
    let mut resolved = BTreeMap::new();
    let mut resolution_order: Vec<String> = Vec::new();

    for token in &entities.tokens {
        let ticker = token.ticker.to_ascii_uppercase();
        match registry.lookup(&ticker) {
            Resolution::Ambiguous => findings.confirm(
                format!("Multiple tokens match '{ticker}'. Please provide the mint address."),
                Feasibility::Medium,
            ),
            Resolution::Resolved(entry) => {
                if !resolved.contains_key(&ticker) {
                    resolution_order.push(ticker.clone());
                }
                resolved.insert(ticker, entry);
            }
            Resolution::Unresolved if !constraints.allows_unknown_tokens() => {
                findings.flags.push(format!("unknown_token:{ticker}"));
                findings.confirm(
                    format!(
                        "Token '{ticker}' is not in the known token registry. Please provide the mint address or enable allow_unknown_tokens."
                    ),
                    Feasibility::Medium,
                );
            }
            Resolution::Unresolved => {}
        }
    }

    let denylist = constraints.denylist();
    if !denylist.is_empty() {
        let denied: HashSet<&str> = denylist.iter().map(String::as_str).collect();
        for ticker in &resolution_order {
            let Some(entry) = resolved.get(ticker) else {
                continue;
            };
            if denied.contains(entry.mint.as_str()) {
                findings.flags.push(format!("denylisted_token:{ticker}"));
                findings.confirm(
                    format!("Token '{ticker}' ({}) is on your denylist.", entry.mint),
                    Feasibility::Low,
                );
            }
        }
    }

    if entities.amounts.is_empty() {
        findings.confirm(
            format!("Amount not specified for {}. How much?", entities.action_type),
            Feasibility::Low,
        );
    }

    if entities.action_type == ActionType::Transfer {
        match entities.destination.as_deref() {
            None => findings.confirm(
                "No destination address provided for transfer.".to_string(),
                Feasibility::Low,
            ),
            Some(destination) if !is_valid_solana_address(destination) => {
                findings.flags.push("invalid_destination".to_string());
                findings.confirm(
                    format!("Destination '{destination}' does not appear to be a valid Solana address."),
                    Feasibility::Low,
                );
            }
            Some(_) => {}
        }
    }

    if let (Some(max), Some(requested)) = (constraints.max_slippage_bps, entities.slippage_bps) {
        if requested > max {
            entities.slippage_bps = Some(max);
        }
    }

    if entities.raw_confidence < LOW_CONFIDENCE_THRESHOLD {
        findings.confirm(
            "Low confidence in intent extraction. Please rephrase or provide more detail."
                .to_string(),
            Feasibility::Medium,
        );
    }

    ValidationResult {
        entities,
        resolved_tokens: resolved,
        safety_flags: findings.flags,
        user_confirmations_needed: findings.confirmations,
        feasibility: findings.feasibility,
    }
}
