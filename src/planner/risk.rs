//! Risk classification for assembled plans.

use super::types::{ActionType, RiskLevel};

/// Classify an action from its validation output. Precedence is fixed.
pub fn classify_risk(
    action_type: ActionType,
    safety_flags: &[String],
    confirmations: &[String],
) -> RiskLevel {
    if safety_flags.len() >= 2 {
        return RiskLevel::High;
    }
    if action_type == ActionType::Unknown {
        return RiskLevel::High;
    }
    if safety_flags
        .iter()
        .any(|flag| flag.starts_with("invalid_destination") || flag.starts_with("denylisted_token"))
    {
        return RiskLevel::High;
    }
    if !safety_flags.is_empty() || !confirmations.is_empty() {
        return RiskLevel::Medium;
    }
    if matches!(
        action_type,
        ActionType::Lend | ActionType::Borrow | ActionType::NftBuy | ActionType::NftSell
    ) {
        return RiskLevel::Medium;
    }
    RiskLevel::Low
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn clean_swap_is_low() {
        assert_eq!(classify_risk(ActionType::Swap, &[], &[]), RiskLevel::Low);
    }

    #[test]
    fn two_flags_are_high_regardless_of_kind() {
        let f = flags(&["unknown_token:FOO", "unknown_token:BAR"]);
        assert_eq!(classify_risk(ActionType::Swap, &f, &[]), RiskLevel::High);
    }

    #[test]
    fn unknown_action_is_high() {
        assert_eq!(classify_risk(ActionType::Unknown, &[], &[]), RiskLevel::High);
    }

    #[test]
    fn severe_single_flags_are_high() {
        for flag in ["invalid_destination", "denylisted_token:BONK"] {
            let f = flags(&[flag]);
            assert_eq!(classify_risk(ActionType::Transfer, &f, &[]), RiskLevel::High);
        }
    }

    #[test]
    fn mild_flag_or_confirmation_is_medium() {
        let f = flags(&["unknown_token:FOO"]);
        assert_eq!(classify_risk(ActionType::Swap, &f, &[]), RiskLevel::Medium);
        let c = flags(&["How much?"]);
        assert_eq!(classify_risk(ActionType::Swap, &[], &c), RiskLevel::Medium);
    }

    #[test]
    fn counterparty_actions_are_medium_when_clean() {
        for action in [
            ActionType::Lend,
            ActionType::Borrow,
            ActionType::NftBuy,
            ActionType::NftSell,
        ] {
            assert_eq!(classify_risk(action, &[], &[]), RiskLevel::Medium);
        }
        assert_eq!(classify_risk(ActionType::Stake, &[], &[]), RiskLevel::Low);
    }
}
