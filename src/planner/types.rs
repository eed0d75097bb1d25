//! Request, entity, and plan artifacts for the planning pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::InputError;
use crate::tokens::TokenRegistryEntry;

/// Canonical mint of the wrapped native asset.
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// Native asset ticker.
pub const NATIVE_TICKER: &str = "SOL";

/// Response flavour requested by the caller.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Lite,
    Pro,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lite => "lite",
            Self::Pro => "pro",
        }
    }

    /// Lenient parse: anything other than `pro` is lite.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw {
            Some("pro") => Self::Pro,
            _ => Self::Lite,
        }
    }
}

/// Optional caller policy applied during validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Constraints {
    #[serde(
        default,
        deserialize_with = "lenient_max_slippage",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_slippage_bps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_sol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_unknown_tokens: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denylist_mints: Option<Vec<String>>,
}

impl Constraints {
    pub fn allows_unknown_tokens(&self) -> bool {
        self.allow_unknown_tokens.unwrap_or(false)
    }

    pub fn denylist(&self) -> &[String] {
        self.denylist_mints.as_deref().unwrap_or_default()
    }
}

/// Validated planning request.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    pub prompt: String,
    pub wallet: Option<String>,
    pub mode: Mode,
    pub constraints: Option<Constraints>,
}

impl PlanRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            wallet: None,
            mode: Mode::Lite,
            constraints: None,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_wallet(mut self, wallet: impl Into<String>) -> Self {
        self.wallet = Some(wallet.into());
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = Some(constraints);
        self
    }

    /// Parse and validate an untyped request body.
    pub fn from_json(body: &Value) -> Result<Self, InputError> {
        let prompt = match body.get("prompt") {
            Some(Value::String(prompt)) if !prompt.is_empty() => prompt.clone(),
            _ => return Err(InputError::MissingPrompt),
        };

        let wallet = match body.get("wallet") {
            None | Some(Value::Null) => None,
            Some(Value::String(wallet)) if wallet.is_empty() => None,
            Some(Value::String(wallet)) => Some(wallet.clone()),
            Some(_) => return Err(InputError::InvalidWallet),
        };

        let constraints = match body.get("constraints") {
            None | Some(Value::Null) => None,
            Some(value @ Value::Object(_)) => Some(
                serde_json::from_value::<Constraints>(value.clone())
                    .map_err(|e| InputError::MalformedConstraints(e.to_string()))?,
            ),
            Some(_) => return Err(InputError::InvalidConstraints),
        };

        let mode = Mode::parse_lenient(body.get("mode").and_then(Value::as_str));

        let request = Self {
            prompt,
            wallet,
            mode,
            constraints,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        if self.prompt.trim().is_empty() {
            return Err(InputError::EmptyPrompt);
        }
        Ok(())
    }
}

/// Fixed enumeration of plannable actions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Swap,
    Transfer,
    Stake,
    Unstake,
    Lend,
    Borrow,
    NftBuy,
    NftSell,
    #[serde(other)]
    Unknown,
}

impl ActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Swap => "swap",
            Self::Transfer => "transfer",
            Self::Stake => "stake",
            Self::Unstake => "unstake",
            Self::Lend => "lend",
            Self::Borrow => "borrow",
            Self::NftBuy => "nft_buy",
            Self::NftSell => "nft_sell",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a token within an action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TokenRole {
    Source,
    Destination,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenRef {
    pub ticker: String,
    pub role: TokenRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AmountRef {
    pub value: f64,
    pub ticker: String,
}

/// Untrusted output of the entity extractor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedEntities {
    pub action_type: ActionType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tokens: Vec<TokenRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub amounts: Vec<AmountRef>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub destination: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub slippage_bps: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub priority_fee_lamports: Option<u64>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub protocol_preference: Option<String>,
    pub raw_confidence: f64,
}

impl ExtractedEntities {
    /// First token carrying `role`, in extraction order.
    pub fn token_with_role(&self, role: TokenRole) -> Option<&TokenRef> {
        self.tokens.iter().find(|token| token.role == role)
    }

    /// First amount whose ticker matches case-insensitively.
    pub fn amount_for(&self, ticker: &str) -> Option<&AmountRef> {
        self.amounts
            .iter()
            .find(|amount| amount.ticker.eq_ignore_ascii_case(ticker))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|value| !value.trim().is_empty()))
}

/// Any finite non-negative JSON number, rounded half away from zero.
fn lenient_number<'de, D>(deserializer: D, field: &str) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(number)) => {
            if let Some(n) = number.as_u64() {
                return Ok(Some(n));
            }
            match number.as_f64() {
                Some(f) if f.is_finite() && f >= 0.0 && f.round() <= u64::MAX as f64 => {
                    Ok(Some(f.round() as u64))
                }
                _ => Err(serde::de::Error::custom(format!(
                    "{field} must be a non-negative number, got {number}"
                ))),
            }
        }
        Some(other) => Err(serde::de::Error::custom(format!(
            "{field} must be a number, got {other}"
        ))),
    }
}

fn lenient_bps<'de, D>(deserializer: D, field: &str) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_number(deserializer, field)?
        .map(|n| {
            u32::try_from(n)
                .map_err(|_| serde::de::Error::custom(format!("{field} out of range: {n}")))
        })
        .transpose()
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_bps(deserializer, "slippage_bps")
}

fn lenient_max_slippage<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_bps(deserializer, "max_slippage_bps")
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_number(deserializer, "priority_fee_lamports")
}

/// Three-point executability scale, high > medium > low.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Feasibility {
    Low,
    Medium,
    High,
}

impl Feasibility {
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 2,
            Self::Medium => 1,
            Self::Low => 0,
        }
    }

    /// Join toward `low`: a proposal only applies if it ranks lower.
    #[must_use]
    pub fn join_down(self, proposed: Self) -> Self {
        if proposed.rank() < self.rank() {
            proposed
        } else {
            self
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Validator output consumed by the assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub entities: ExtractedEntities,
    /// Upper-cased ticker -> registry entry.
    pub resolved_tokens: BTreeMap<String, TokenRegistryEntry>,
    pub safety_flags: Vec<String>,
    pub user_confirmations_needed: Vec<String>,
    pub feasibility: Feasibility,
}

impl ValidationResult {
    pub fn resolve(&self, ticker: &str) -> Option<&TokenRegistryEntry> {
        self.resolved_tokens.get(&ticker.to_ascii_uppercase())
    }
}

/// Token slot on the input side of a step. Unknown fields are explicit nulls.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TokenInput {
    pub ticker: Option<String>,
    pub mint: Option<String>,
    pub amount: Option<f64>,
}

/// Token slot on the output side of a step.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TokenOutput {
    pub ticker: Option<String>,
    pub mint: Option<String>,
    pub amount_estimate: Option<f64>,
}

/// Per-action input descriptor.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum StepInputs {
    Swap {
        input_token: TokenInput,
        slippage_bps: Option<u32>,
    },
    Transfer {
        token: TokenInput,
        destination: Option<String>,
    },
    Stake {
        token: TokenInput,
    },
    ByRole {
        #[serde(skip_serializing_if = "Option::is_none")]
        source: Option<TokenInput>,
        #[serde(skip_serializing_if = "Option::is_none")]
        destination: Option<TokenInput>,
    },
}

/// Per-action output descriptor.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum StepOutputs {
    Swap { output_token: TokenOutput },
    Empty {},
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActionStep {
    pub step: u32,
    pub step_type: ActionType,
    pub protocol_hint: Option<String>,
    pub inputs: StepInputs,
    pub outputs: StepOutputs,
    pub required_data: Vec<String>,
    pub safety_flags: Vec<String>,
    pub user_confirmations_needed: Vec<String>,
}

/// Flattened view of what was extracted.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct EntitySummary {
    pub amounts: Vec<AmountRef>,
    pub tickers: Vec<String>,
    pub mints: BTreeMap<String, String>,
    pub slippage_bps: Option<u32>,
    pub priority_fee: Option<u64>,
    pub destinations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActionPlan {
    pub intent: String,
    pub action_plan: Vec<ActionStep>,
    pub extracted_entities: EntitySummary,
    pub feasibility: Feasibility,
    pub risk_level: RiskLevel,
    pub reasons: Vec<String>,
    pub share_text: String,
}

impl ActionPlan {
    /// Fixed plan returned when the danger gate trips.
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            intent: "blocked".to_string(),
            action_plan: Vec::new(),
            extracted_entities: EntitySummary::default(),
            feasibility: Feasibility::Low,
            risk_level: RiskLevel::High,
            reasons: vec![reason.into()],
            share_text: String::new(),
        }
    }
}

/// Live quote attached in pro mode.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuoteSummary {
    pub source: String,
    pub input_amount: f64,
    pub input_token: String,
    pub output_amount_estimate: f64,
    pub output_token: String,
    pub price_impact_pct: f64,
    pub route_description: String,
    pub fetched_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SimulationStatus {
    Estimated,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TokenChange {
    pub token: String,
    pub change: String,
}

/// Quote-derived cost estimate. Never an on-chain simulation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SimulationSummary {
    pub status: SimulationStatus,
    pub sol_change: f64,
    pub token_changes: Vec<TokenChange>,
    pub estimated_compute_units: u64,
    pub note: String,
}

/// Full response returned by `process_plan`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NlPlanResponse {
    #[serde(flatten)]
    pub plan: ActionPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_summary: Option<Option<QuoteSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation_summary: Option<Option<SimulationSummary>>,
}

impl From<ActionPlan> for NlPlanResponse {
    fn from(plan: ActionPlan) -> Self {
        Self {
            plan,
            quote_summary: None,
            simulation_summary: None,
        }
    }
}
