//! Configuration for nlplan.
//!
//! Values resolve with priority: env var > TOML settings file > default.
//! `./.env` is loaded via dotenvy first and never overwrites real env vars.

mod cache;
pub(crate) mod helpers;
mod llm;
mod server;
mod upstream;

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::logging::LogFormat;
use crate::settings::Settings;

pub use self::cache::CacheConfig;
pub use self::llm::LlmConfig;
pub use self::server::ServerConfig;
pub use self::upstream::{QuoteConfig, TokenListConfig};

/// Serializes tests that read or mutate process env vars.
#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Main configuration for the planner service.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub tokens: TokenListConfig,
    pub quote: QuoteConfig,
    pub cache: CacheConfig,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from env vars and the default settings file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_toml(None)
    }

    /// Load from env with an optional TOML config file overlay.
    pub fn from_env_with_toml(toml_path: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let mut settings = Settings::default();

        Self::apply_toml_overlay(&mut settings, toml_path)?;

        Self::build(&settings)
    }

    /// Load and merge a TOML config file into settings.
    ///
    /// If `explicit_path` is `Some`, loads from that path (errors are fatal).
    /// If `None`, tries `./nlplan.toml` (missing file is silently ignored).
    fn apply_toml_overlay(
        settings: &mut Settings,
        explicit_path: Option<&Path>,
    ) -> Result<(), ConfigError> {
        let path = explicit_path
            .map(PathBuf::from)
            .unwrap_or_else(Settings::default_toml_path);

        match Settings::load_toml(&path) {
            Ok(Some(toml_settings)) => {
                settings.merge_from(&toml_settings);
                tracing::debug!("Loaded TOML config from {}", path.display());
            }
            Ok(None) => {
                if explicit_path.is_some() {
                    return Err(ConfigError::ParseError(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
            }
            Err(e) => {
                if explicit_path.is_some() {
                    return Err(ConfigError::ParseError(format!(
                        "Failed to load config file {}: {}",
                        path.display(),
                        e
                    )));
                }
                tracing::warn!("Failed to load default config file: {}", e);
            }
        }
        Ok(())
    }

    /// Resolve every section against env vars, falling back to `settings`.
    pub fn build(settings: &Settings) -> Result<Self, ConfigError> {
        let log_format = LogFormat::parse(
            &helpers::optional_env("LOG_FORMAT")?
                .unwrap_or_else(|| settings.logging.format.clone()),
            "LOG_FORMAT",
        )?;

        Ok(Self {
            server: ServerConfig::resolve(settings)?,
            llm: LlmConfig::resolve(settings)?,
            tokens: TokenListConfig::resolve(settings)?,
            quote: QuoteConfig::resolve(settings)?,
            cache: CacheConfig::resolve(settings)?,
            log_format,
        })
    }
}
