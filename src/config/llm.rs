use std::time::Duration;

use secrecy::SecretString;

use crate::config::helpers::{optional_env, parse_env, require_positive, validate_endpoint_url};
use crate::error::ConfigError;
use crate::settings::Settings;

/// Entity extraction provider configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// `None` leaves the extractor unconfigured; plan requests then fail with 503.
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl LlmConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let api_key = optional_env("ANTHROPIC_API_KEY")?.map(SecretString::from);

        let base_url = validate_endpoint_url(
            "ANTHROPIC_BASE_URL",
            &optional_env("ANTHROPIC_BASE_URL")?.unwrap_or_else(|| settings.llm.base_url.clone()),
        )?;

        let model = optional_env("ANTHROPIC_MODEL")?.unwrap_or_else(|| settings.llm.model.clone());

        let timeout_ms = parse_env(
            "LLM_TIMEOUT_MS",
            settings.llm.timeout_ms,
            "a positive integer",
        )?;
        let timeout_ms = require_positive("LLM_TIMEOUT_MS", timeout_ms)?;

        Ok(Self {
            api_key,
            base_url,
            model,
            timeout: Duration::from_millis(timeout_ms),
        })
    }
}
