//! Request orchestration: cache, danger gate, extraction, validation,
//! assembly, and pro enrichment.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;

use super::assembler::assemble_plan;
use super::cache::{LITE_TTL, PRO_TTL, ResponseCache};
use super::danger::check_danger;
use super::fingerprint::cache_key;
use super::types::{ActionPlan, Mode, NlPlanResponse, PlanRequest};
use super::validator::validate_entities;
use crate::error::{ExtractionError, PlanError};
use crate::llm::EntityExtractor;
use crate::quote::{ProEnricher, QuoteService};
use crate::tokens::TokenRegistry;

/// Per-call switches supplied by the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanOptions {
    /// Skip both cache read and write.
    pub no_cache: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub lite: Duration,
    pub pro: Duration,
}

impl CacheTtls {
    fn for_mode(self, mode: Mode) -> Duration {
        match mode {
            Mode::Lite => self.lite,
            Mode::Pro => self.pro,
        }
    }
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            lite: LITE_TTL,
            pro: PRO_TTL,
        }
    }
}

/// Process-lifetime planner. Shared registry and cache; everything else is per request.
pub struct Planner {
    registry: Arc<TokenRegistry>,
    cache: ResponseCache,
    ttls: CacheTtls,
    extractor: Option<Arc<dyn EntityExtractor>>,
    enricher: ProEnricher,
}

impl Planner {
    /// `extractor` is `None` when no provider key is configured.
    pub fn new(
        registry: Arc<TokenRegistry>,
        extractor: Option<Arc<dyn EntityExtractor>>,
        quotes: Arc<dyn QuoteService>,
    ) -> Self {
        Self {
            registry,
            cache: ResponseCache::default(),
            ttls: CacheTtls::default(),
            extractor,
            enricher: ProEnricher::new(quotes),
        }
    }

    pub fn with_cache(mut self, cache: ResponseCache, ttls: CacheTtls) -> Self {
        self.cache = cache;
        self.ttls = ttls;
        self
    }

    pub fn registry(&self) -> &Arc<TokenRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn is_extractor_configured(&self) -> bool {
        self.extractor.is_some()
    }

    /// Run one request. Panics inside the pipeline surface as `PlanError::Internal`.
    pub async fn process_plan(
        &self,
        request: &PlanRequest,
        options: PlanOptions,
    ) -> Result<NlPlanResponse, PlanError> {
        let started = Instant::now();
        let outcome = AssertUnwindSafe(self.run(request, options))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(PlanError::Internal(detail))
            });

        if let Err(PlanError::Internal(detail)) = &outcome {
            tracing::error!(
                error = %detail,
                duration_ms = started.elapsed().as_millis() as u64,
                "internal_error"
            );
        }
        outcome
    }

    async fn run(
        &self,
        request: &PlanRequest,
        options: PlanOptions,
    ) -> Result<NlPlanResponse, PlanError> {
        let started = Instant::now();
        request.validate()?;
        let mode = request.mode;

        tracing::info!(
            mode = mode.as_str(),
            has_wallet = request.wallet.is_some(),
            prompt_length = request.prompt.len(),
            "nl_plan_request"
        );

        let key = (request.wallet.is_none() && !options.no_cache)
            .then(|| cache_key(&request.prompt, mode, request.constraints.as_ref()));

        if let Some(key) = key.as_deref() {
            if let Some(cached) = self.cache.get(key) {
                tracing::info!(cache_key = %key, "cache_hit");
                return Ok(cached);
            }
        }

        if let Some(reason) = check_danger(&request.prompt).reason() {
            tracing::warn!(reason, "danger_detected");
            return Ok(ActionPlan::blocked(reason).into());
        }

        let extractor = self
            .extractor
            .as_ref()
            .ok_or(PlanError::Extraction(ExtractionError::NotConfigured))?;

        let entities = match extractor
            .extract(&request.prompt, request.constraints.as_ref())
            .await
        {
            Ok(entities) => entities,
            Err(error) => {
                tracing::error!(error = %error, "extraction_failed");
                return Err(error.into());
            }
        };
        tracing::info!(
            action_type = entities.action_type.as_str(),
            confidence = entities.raw_confidence,
            "extraction_complete"
        );

        if self.registry.needs_refresh() {
            let registry = Arc::clone(&self.registry);
            tokio::spawn(async move {
                registry.refresh().await;
            });
        }

        let validation =
            validate_entities(entities, request.constraints.as_ref(), &self.registry);
        let plan = assemble_plan(&validation);
        let mut response = NlPlanResponse::from(plan);

        if mode == Mode::Pro {
            let decimals: HashMap<String, u8> = validation
                .resolved_tokens
                .values()
                .map(|entry| (entry.mint.clone(), entry.decimals))
                .collect();
            let enrichment = self
                .enricher
                .enrich(&response.plan, request.wallet.as_deref(), &decimals)
                .await;
            if let Some(error) = &enrichment.error {
                tracing::warn!(error = %error, "pro_enrichment_degraded");
            }
            response.quote_summary = Some(enrichment.quote_summary);
            response.simulation_summary = Some(enrichment.simulation_summary);
        }

        if let Some(key) = key {
            self.cache
                .put(key, response.clone(), self.ttls.for_mode(mode));
        }

        tracing::info!(
            mode = mode.as_str(),
            feasibility = response.plan.feasibility.as_str(),
            duration_ms = started.elapsed().as_millis() as u64,
            "nl_plan_response"
        );
        Ok(response)
    }
}
