//! Live quote enrichment for pro-mode swap plans.

mod enricher;
mod jupiter;

use async_trait::async_trait;

use crate::error::QuoteError;

pub use self::enricher::{
    DEFAULT_SLIPPAGE_BPS, ESTIMATED_SWAP_COMPUTE_UNITS, ESTIMATED_TX_FEE_LAMPORTS,
    EnrichmentResult, ProEnricher, SIMULATION_NOTE,
};
pub use self::jupiter::{DEFAULT_QUOTE_URL, JupiterQuoteClient};

/// Quote request in smallest on-chain units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub input_mint: String,
    pub output_mint: String,
    pub amount: u64,
    pub slippage_bps: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteLeg {
    pub label: String,
}

/// Quote as returned by the routing service, output still in base units.
#[derive(Debug, Clone, PartialEq)]
pub struct RawQuote {
    pub out_amount: String,
    pub price_impact_pct: String,
    pub route: Vec<RouteLeg>,
}

/// External price-routing service.
#[async_trait]
pub trait QuoteService: Send + Sync {
    async fn quote(&self, request: &QuoteRequest) -> Result<RawQuote, QuoteError>;
}
