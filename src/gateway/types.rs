//! Response bodies for the HTTP surface.

use serde::Serialize;

use crate::error::ErrorCode;
use crate::planner::types::ActionType;

pub const NL_PLAN_PATH: &str = "/api/v1/solana/nl-plan";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Error body shared by every failure response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, error_code: ErrorCode) -> Self {
        Self {
            error: error.into(),
            error_code,
            detail: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RateLimitedResponse {
    pub error: &'static str,
    pub error_code: ErrorCode,
    pub retry_after_seconds: u64,
}

// --- Endpoint metadata ---

#[derive(Debug, Serialize)]
pub struct Pricing {
    pub amount: &'static str,
    pub unit: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SchemaRef {
    #[serde(rename = "$ref")]
    pub reference: &'static str,
}

/// Self-description served on `GET /api/v1/solana/nl-plan`.
#[derive(Debug, Serialize)]
pub struct EndpointMetadata {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoint: &'static str,
    pub method: &'static str,
    pub pricing: Pricing,
    pub modes: [&'static str; 2],
    pub supported_actions: Vec<&'static str>,
    pub supported_protocols: [&'static str; 8],
    pub input_schema: SchemaRef,
    pub output_schema: SchemaRef,
}

impl EndpointMetadata {
    pub fn current() -> Self {
        Self {
            name: "Solana NL Action Plan Translator",
            version: "1.0.0",
            description: "Translates natural language prompts into structured, safe Solana \
                          action plans. Planner-only by default, no ready-to-sign transactions.",
            endpoint: NL_PLAN_PATH,
            method: "POST",
            pricing: Pricing {
                amount: "$0.02",
                unit: "per call",
            },
            modes: ["lite", "pro"],
            supported_actions: [
                ActionType::Swap,
                ActionType::Transfer,
                ActionType::Stake,
                ActionType::Unstake,
                ActionType::Lend,
                ActionType::Borrow,
                ActionType::NftBuy,
                ActionType::NftSell,
            ]
            .into_iter()
            .map(ActionType::as_str)
            .collect(),
            supported_protocols: [
                "jupiter", "sanctum", "pumpfun", "pumpswap", "raydium", "tensor", "marinade",
                "jito",
            ],
            input_schema: SchemaRef {
                reference: "#/definitions/NLPlanRequest",
            },
            output_schema: SchemaRef {
                reference: "#/definitions/NLPlanResponse",
            },
        }
    }
}
