//! Natural-language to action-plan pipeline.
//!
//! ```text
//! prompt ─► cache ─► danger gate ─► extractor ─► validator ─► assembler ─► [pro enricher] ─► cache
//! ```

mod assembler;
mod cache;
mod danger;
mod fingerprint;
mod pipeline;
mod risk;
pub mod types;
mod validator;

pub use self::assembler::{assemble_plan, required_data, resolve_protocol_hint};
pub use self::cache::{DEFAULT_CAPACITY, LITE_TTL, PRO_TTL, ResponseCache};
pub use self::danger::{DRAIN_REASON, DangerKind, DangerVerdict, INJECTION_REASON, check_danger};
pub use self::fingerprint::{
    CACHE_KEY_PREFIX, cache_key, deterministic_hash, normalize_constraints, normalize_prompt,
};
pub use self::pipeline::{CacheTtls, PlanOptions, Planner};
pub use self::risk::classify_risk;
pub use self::types::{
    ActionPlan, ActionType, Constraints, ExtractedEntities, Feasibility, Mode, NlPlanResponse,
    PlanRequest, RiskLevel, ValidationResult,
};
pub use self::validator::{LOW_CONFIDENCE_THRESHOLD, is_valid_solana_address, validate_entities};
