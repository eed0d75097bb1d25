//! Attaches a live quote and a quote-derived cost estimate to swap plans.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use rust_decimal::prelude::{FromPrimitive, MathematicalOps, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use super::{QuoteRequest, QuoteService, RawQuote};
use crate::error::QuoteError;
use crate::planner::types::{
    ActionPlan, QuoteSummary, SOL_MINT, SimulationStatus, SimulationSummary, StepInputs,
    StepOutputs, TokenChange,
};

pub const DEFAULT_SLIPPAGE_BPS: u32 = 50;
pub const ESTIMATED_SWAP_COMPUTE_UNITS: u64 = 200_000;
pub const ESTIMATED_TX_FEE_LAMPORTS: i64 = 5_000;
pub const SIMULATION_NOTE: &str = "Estimated from quote. No on-chain simulation was performed.";

const NATIVE_DECIMALS: u8 = 9;
const DEFAULT_DECIMALS: u8 = 6;

/// Enrichment output. Both summaries are `None` when not applicable or degraded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentResult {
    pub quote_summary: Option<QuoteSummary>,
    pub simulation_summary: Option<SimulationSummary>,
    pub error: Option<String>,
}

/// Swap leg pulled out of the plan's first step.
struct SwapLeg<'a> {
    input_ticker: &'a str,
    input_mint: &'a str,
    amount: f64,
    output_ticker: &'a str,
    output_mint: &'a str,
}

fn swap_leg(plan: &ActionPlan) -> Option<SwapLeg<'_>> {
    let step = plan.action_plan.first()?;
    let (
        StepInputs::Swap { input_token, .. },
        StepOutputs::Swap { output_token },
    ) = (&step.inputs, &step.outputs)
    else {
        return None;
    };
    Some(SwapLeg {
        input_ticker: input_token.ticker.as_deref().unwrap_or_default(),
        input_mint: input_token.mint.as_deref()?,
        amount: input_token.amount?,
        output_ticker: output_token.ticker.as_deref().unwrap_or_default(),
        output_mint: output_token.mint.as_deref()?,
    })
}

fn decimals_for(mint: &str, decimals: &HashMap<String, u8>) -> u8 {
    decimals.get(mint).copied().unwrap_or(if mint == SOL_MINT {
        NATIVE_DECIMALS
    } else {
        DEFAULT_DECIMALS
    })
}

/// Nearest f64 to the decimal value.
fn decimal_to_f64(value: Decimal) -> Option<f64> {
    value.normalize().to_string().parse().ok()
}

fn to_decimal(amount: f64) -> Result<Decimal, QuoteError> {
    Decimal::from_f64(amount)
        .ok_or_else(|| QuoteError::InvalidAmount(format!("{amount} is not a finite decimal")))
}

/// Display amount to base units, rounding half away from zero.
pub(crate) fn to_smallest_unit(amount: f64, decimals: u8) -> Result<u64, QuoteError> {
    let scale = Decimal::TEN
        .checked_powi(i64::from(decimals))
        .ok_or_else(|| QuoteError::InvalidAmount(format!("{decimals} decimals overflow")))?;
    to_decimal(amount)?
        .checked_mul(scale)
        .map(|units| units.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|units| units.to_u64())
        .ok_or_else(|| QuoteError::InvalidAmount(format!("{amount} at {decimals} decimals")))
}

/// Base units back to display units at the token's precision.
pub(crate) fn from_smallest_unit(raw: &str, decimals: u8) -> Result<f64, QuoteError> {
    let units: i128 = raw
        .trim()
        .parse()
        .map_err(|e| QuoteError::Decode(format!("outAmount '{raw}': {e}")))?;
    Decimal::try_from_i128_with_scale(units, u32::from(decimals))
        .ok()
        .and_then(decimal_to_f64)
        .ok_or_else(|| QuoteError::Decode(format!("outAmount '{raw}' out of range")))
}

pub struct ProEnricher {
    service: Arc<dyn QuoteService>,
}

impl ProEnricher {
    pub fn new(service: Arc<dyn QuoteService>) -> Self {
        Self { service }
    }

    /// Quote the plan's swap. Non-swap plans and incomplete swaps pass through empty.
    pub async fn enrich(
        &self,
        plan: &ActionPlan,
        wallet: Option<&str>,
        decimals: &HashMap<String, u8>,
    ) -> EnrichmentResult {
        let Some(leg) = swap_leg(plan) else {
            return EnrichmentResult::default();
        };
        let slippage_bps = plan
            .extracted_entities
            .slippage_bps
            .unwrap_or(DEFAULT_SLIPPAGE_BPS);

        let quote = match self.fetch_quote(&leg, slippage_bps, decimals).await {
            Ok(quote) => quote,
            Err(error) => {
                return EnrichmentResult {
                    error: Some(error.to_string()),
                    ..EnrichmentResult::default()
                };
            }
        };

        let simulation_summary = match wallet {
            Some(_) => match estimate_cost(&leg, quote.output_amount_estimate) {
                Ok(summary) => Some(summary),
                Err(error) => {
                    return EnrichmentResult {
                        quote_summary: Some(quote),
                        simulation_summary: None,
                        error: Some(error.to_string()),
                    };
                }
            },
            None => None,
        };

        EnrichmentResult {
            quote_summary: Some(quote),
            simulation_summary,
            error: None,
        }
    }

    async fn fetch_quote(
        &self,
        leg: &SwapLeg<'_>,
        slippage_bps: u32,
        decimals: &HashMap<String, u8>,
    ) -> Result<QuoteSummary, QuoteError> {
        let input_decimals = decimals_for(leg.input_mint, decimals);
        let output_decimals = decimals_for(leg.output_mint, decimals);

        let request = QuoteRequest {
            input_mint: leg.input_mint.to_string(),
            output_mint: leg.output_mint.to_string(),
            amount: to_smallest_unit(leg.amount, input_decimals)?,
            slippage_bps,
        };
        let raw = self.service.quote(&request).await?;
        summarize(leg, &raw, output_decimals)
    }
}

fn summarize(leg: &SwapLeg<'_>, raw: &RawQuote, output_decimals: u8) -> Result<QuoteSummary, QuoteError> {
    let output_amount_estimate = from_smallest_unit(&raw.out_amount, output_decimals)?;
    let price_impact_pct = raw
        .price_impact_pct
        .trim()
        .parse::<f64>()
        .map_err(|e| QuoteError::Decode(format!("priceImpactPct '{}': {e}", raw.price_impact_pct)))?;

    let labels: Vec<&str> = raw.route.iter().map(|leg| leg.label.as_str()).collect();
    let path = if labels.is_empty() {
        "direct".to_string()
    } else {
        labels.join(" → ")
    };

    Ok(QuoteSummary {
        source: "jupiter".to_string(),
        input_amount: leg.amount,
        input_token: leg.input_ticker.to_string(),
        output_amount_estimate,
        output_token: leg.output_ticker.to_string(),
        price_impact_pct,
        route_description: format!("{} → {} ({path})", leg.input_ticker, leg.output_ticker),
        fetched_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

fn estimate_cost(leg: &SwapLeg<'_>, output_estimate: f64) -> Result<SimulationSummary, QuoteError> {
    let fee = Decimal::new(ESTIMATED_TX_FEE_LAMPORTS, 9);
    let native_input = leg.input_mint == SOL_MINT;
    let spent = if native_input {
        to_decimal(leg.amount)? + fee
    } else {
        fee
    };
    let sol_change = decimal_to_f64(-spent)
        .ok_or_else(|| QuoteError::InvalidAmount(format!("{spent} SOL")))?;

    let mut token_changes = Vec::with_capacity(2);
    if !native_input {
        token_changes.push(TokenChange {
            token: leg.input_ticker.to_string(),
            change: format!("-{}", leg.amount),
        });
    }
    token_changes.push(TokenChange {
        token: leg.output_ticker.to_string(),
        change: format!("+{output_estimate}"),
    });

    Ok(SimulationSummary {
        status: SimulationStatus::Estimated,
        sol_change,
        token_changes,
        estimated_compute_units: ESTIMATED_SWAP_COMPUTE_UNITS,
        note: SIMULATION_NOTE.to_string(),
    })
}
