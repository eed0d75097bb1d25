//! Jupiter v6 quote client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{QuoteRequest, QuoteService, RawQuote, RouteLeg};
use crate::error::QuoteError;

pub const DEFAULT_QUOTE_URL: &str = "https://quote-api.jup.ag/v6/quote";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    out_amount: String,
    price_impact_pct: String,
    #[serde(default)]
    route_plan: Vec<RoutePlanStep>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoutePlanStep {
    swap_info: SwapInfo,
}

#[derive(Debug, Deserialize)]
struct SwapInfo {
    #[serde(default)]
    label: String,
}

impl From<QuoteResponse> for RawQuote {
    fn from(response: QuoteResponse) -> Self {
        Self {
            out_amount: response.out_amount,
            price_impact_pct: response.price_impact_pct,
            route: response
                .route_plan
                .into_iter()
                .map(|step| RouteLeg {
                    label: step.swap_info.label,
                })
                .collect(),
        }
    }
}

pub struct JupiterQuoteClient {
    client: reqwest::Client,
    base_url: String,
}

impl JupiterQuoteClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, QuoteError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl QuoteService for JupiterQuoteClient {
    async fn quote(&self, request: &QuoteRequest) -> Result<RawQuote, QuoteError> {
        let query = [
            ("inputMint", request.input_mint.clone()),
            ("outputMint", request.output_mint.clone()),
            ("amount", request.amount.to_string()),
            ("slippageBps", request.slippage_bps.to_string()),
        ];
        tracing::debug!(
            input_mint = %request.input_mint,
            output_mint = %request.output_mint,
            amount = request.amount,
            "fetching jupiter quote"
        );

        let response = self.client.get(&self.base_url).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(QuoteError::Status {
                status: status.as_u16(),
            });
        }
        let body: QuoteResponse = response.json().await?;
        Ok(body.into())
    }
}
