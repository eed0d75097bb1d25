//! Wiring of the planner from resolved configuration.
//!
//! Builds the HTTP-backed collaborators (token list, quote service,
//! extraction model) and hands them to [`Planner`]. A missing
//! `ANTHROPIC_API_KEY` leaves the extractor unset rather than failing startup.

use std::sync::Arc;

use crate::config::Config;
use crate::error::Error;
use crate::llm::{AnthropicClient, EntityExtractor, LlmEntityExtractor};
use crate::planner::{Planner, ResponseCache};
use crate::quote::JupiterQuoteClient;
use crate::tokens::{JupiterTokenList, TokenRegistry};

pub fn build_planner(config: &Config) -> Result<Planner, Error> {
    let token_list = JupiterTokenList::new(config.tokens.url.clone(), config.tokens.timeout)?;
    let registry = Arc::new(TokenRegistry::with_refresh_interval(
        Arc::new(token_list),
        config.tokens.refresh_interval,
    ));

    let extractor: Option<Arc<dyn EntityExtractor>> = match &config.llm.api_key {
        Some(api_key) => {
            let client = AnthropicClient::new(
                api_key.clone(),
                config.llm.base_url.clone(),
                config.llm.model.clone(),
                config.llm.timeout,
            )?;
            Some(Arc::new(LlmEntityExtractor::new(Arc::new(client))))
        }
        None => {
            tracing::warn!("ANTHROPIC_API_KEY not set; plan requests will return 503");
            None
        }
    };

    let quotes = JupiterQuoteClient::new(config.quote.url.clone(), config.quote.timeout)?;

    Ok(
        Planner::new(registry, extractor, Arc::new(quotes)).with_cache(
            ResponseCache::new(config.cache.capacity),
            config.cache.ttls,
        ),
    )
}
