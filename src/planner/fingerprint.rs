//! Deterministic cache keys for planning requests.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use super::types::{Constraints, Mode};

pub const CACHE_KEY_PREFIX: &str = "nlplan:";

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern must compile"));

/// Lowercase, collapse whitespace, trim, strip trailing `.`, `!`, `?`.
pub fn normalize_prompt(prompt: &str) -> String {
    let lowered = prompt.to_lowercase();
    let collapsed = WHITESPACE_RE.replace_all(&lowered, " ");
    collapsed
        .trim()
        .trim_end_matches(['.', '!', '?'])
        .to_string()
}

/// JSON object with lexicographically sorted keys, `{}` when absent.
///
/// Built from the typed constraints, so `null` fields and unknown keys do not
/// contribute: they have no effect on the plan either.
pub fn normalize_constraints(constraints: Option<&Constraints>) -> String {
    let Some(constraints) = constraints else {
        return "{}".to_string();
    };
    // serde_json's default Map is ordered by key.
    match serde_json::to_value(constraints) {
        Ok(value @ serde_json::Value::Object(_)) => value.to_string(),
        _ => "{}".to_string(),
    }
}

pub fn deterministic_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// `nlplan:` + sha256(`prompt|mode|constraints`).
pub fn cache_key(prompt: &str, mode: Mode, constraints: Option<&Constraints>) -> String {
    let material = format!(
        "{}|{}|{}",
        normalize_prompt(prompt),
        mode.as_str(),
        normalize_constraints(constraints)
    );
    format!("{CACHE_KEY_PREFIX}{}", deterministic_hash(&material))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_normalization() {
        assert_eq!(
            normalize_prompt("  Swap   2 SOL\tto USDC!!  "),
            "swap 2 sol to usdc"
        );
        assert_eq!(normalize_prompt("stake sol?."), "stake sol");
        assert_eq!(normalize_prompt("what?! now"), "what?! now");
    }

    #[test]
    fn constraints_are_sorted_and_default_to_empty_object() {
        assert_eq!(normalize_constraints(None), "{}");
        let constraints = Constraints {
            max_slippage_bps: Some(50),
            allow_unknown_tokens: Some(true),
            ..Constraints::default()
        };
        assert_eq!(
            normalize_constraints(Some(&constraints)),
            r#"{"allow_unknown_tokens":true,"max_slippage_bps":50}"#
        );
    }

    #[test]
    fn equivalent_prompts_share_a_key() {
        let a = cache_key("Swap 2 SOL to USDC.", Mode::Lite, None);
        let b = cache_key("swap  2 sol to usdc", Mode::Lite, None);
        assert_eq!(a, b);
        assert!(a.starts_with(CACHE_KEY_PREFIX));
        assert_eq!(a.len(), CACHE_KEY_PREFIX.len() + 64);
    }

    #[test]
    fn mode_and_constraints_change_the_key() {
        let lite = cache_key("swap 2 sol to usdc", Mode::Lite, None);
        let pro = cache_key("swap 2 sol to usdc", Mode::Pro, None);
        assert_ne!(lite, pro);

        let constrained = cache_key(
            "swap 2 sol to usdc",
            Mode::Lite,
            Some(&Constraints {
                max_slippage_bps: Some(10),
                ..Constraints::default()
            }),
        );
        assert_ne!(lite, constrained);
    }

    #[test]
    fn null_and_unknown_constraint_keys_share_the_empty_key() {
        use serde_json::json;

        let parse = |value: serde_json::Value| -> Constraints {
            serde_json::from_value(value).unwrap()
        };
        let prompt = "swap 2 sol to usdc";
        let empty = cache_key(prompt, Mode::Lite, Some(&parse(json!({}))));

        for raw in [
            json!({ "max_slippage_bps": null }),
            json!({ "favourite_colour": "teal" }),
        ] {
            assert_eq!(cache_key(prompt, Mode::Lite, Some(&parse(raw))), empty);
        }

        let float = parse(json!({ "max_slippage_bps": 50.0 }));
        assert_eq!(
            normalize_constraints(Some(&float)),
            r#"{"max_slippage_bps":50}"#
        );
    }

    #[test]
    fn hash_is_sha256_hex() {
        assert_eq!(
            deterministic_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
