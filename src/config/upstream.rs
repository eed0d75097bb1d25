use std::time::Duration;

use crate::config::helpers::{optional_env, parse_env, require_positive, validate_endpoint_url};
use crate::error::ConfigError;
use crate::settings::Settings;

/// Token list service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenListConfig {
    pub url: String,
    pub refresh_interval: Duration,
    pub timeout: Duration,
}

/// Quote service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteConfig {
    pub url: String,
    pub timeout: Duration,
}

/// `HTTP_TIMEOUT_MS` applies to both upstream services.
fn http_timeout(fallback_ms: u64) -> Result<Duration, ConfigError> {
    let timeout_ms = parse_env("HTTP_TIMEOUT_MS", fallback_ms, "a positive integer")?;
    Ok(Duration::from_millis(require_positive(
        "HTTP_TIMEOUT_MS",
        timeout_ms,
    )?))
}

impl TokenListConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let url = validate_endpoint_url(
            "TOKEN_LIST_URL",
            &optional_env("TOKEN_LIST_URL")?.unwrap_or_else(|| settings.tokens.list_url.clone()),
        )?;

        let refresh_secs = optional_env("TOKEN_REFRESH_INTERVAL_SECS")?
            .map(|s| s.parse())
            .transpose()
            .map_err(|e| ConfigError::InvalidValue {
                key: "TOKEN_REFRESH_INTERVAL_SECS".to_string(),
                message: format!("must be a positive integer: {e}"),
            })?
            .unwrap_or(settings.tokens.refresh_interval_secs);
        let refresh_secs = require_positive("TOKEN_REFRESH_INTERVAL_SECS", refresh_secs)?;

        Ok(Self {
            url,
            refresh_interval: Duration::from_secs(refresh_secs),
            timeout: http_timeout(settings.tokens.timeout_ms)?,
        })
    }
}

impl QuoteConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let url = validate_endpoint_url(
            "QUOTE_API_URL",
            &optional_env("QUOTE_API_URL")?.unwrap_or_else(|| settings.quote.api_url.clone()),
        )?;

        Ok(Self {
            url,
            timeout: http_timeout(settings.quote.timeout_ms)?,
        })
    }
}
