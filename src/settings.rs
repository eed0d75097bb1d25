//! Settings file document.
//!
//! Loaded from `./nlplan.toml` (or an explicit `--config` path) and layered
//! under environment variables by [`crate::config::Config`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Settings persisted in the TOML file. Every section is optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub tokens: TokenSettings,

    #[serde(default)]
    pub quote: QuoteSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-IP requests per minute on `/api`. Zero disables the throttle.
    #[serde(default = "default_rate_limit_rpm")]
    pub rate_limit_rpm: u32,

    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_rate_limit_rpm() -> u32 {
    60
}

fn default_body_limit_bytes() -> usize {
    10 * 1024
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            rate_limit_rpm: default_rate_limit_rpm(),
            body_limit_bytes: default_body_limit_bytes(),
        }
    }
}

/// Extraction model settings. The API key is only read from the environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSettings {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_llm_base_url() -> String {
    crate::llm::DEFAULT_BASE_URL.to_string()
}

fn default_llm_model() -> String {
    crate::llm::DEFAULT_MODEL.to_string()
}

fn default_llm_timeout_ms() -> u64 {
    20_000
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            timeout_ms: default_llm_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenSettings {
    #[serde(default = "default_token_list_url")]
    pub list_url: String,

    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_token_list_url() -> String {
    crate::tokens::DEFAULT_TOKEN_LIST_URL.to_string()
}

fn default_refresh_interval_secs() -> u64 {
    crate::tokens::DEFAULT_REFRESH_INTERVAL.as_secs()
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            list_url: default_token_list_url(),
            refresh_interval_secs: default_refresh_interval_secs(),
            timeout_ms: default_http_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuoteSettings {
    #[serde(default = "default_quote_api_url")]
    pub api_url: String,

    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_quote_api_url() -> String {
    crate::quote::DEFAULT_QUOTE_URL.to_string()
}

impl Default for QuoteSettings {
    fn default() -> Self {
        Self {
            api_url: default_quote_api_url(),
            timeout_ms: default_http_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheSettings {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    #[serde(default = "default_lite_ttl_secs")]
    pub lite_ttl_secs: u64,

    #[serde(default = "default_pro_ttl_secs")]
    pub pro_ttl_secs: u64,
}

fn default_cache_capacity() -> usize {
    crate::planner::DEFAULT_CAPACITY
}

fn default_lite_ttl_secs() -> u64 {
    crate::planner::LITE_TTL.as_secs()
}

fn default_pro_ttl_secs() -> u64 {
    crate::planner::PRO_TTL.as_secs()
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            lite_ttl_secs: default_lite_ttl_secs(),
            pro_ttl_secs: default_pro_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// "json" or "pretty".
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}

impl Settings {
    /// Default TOML config file path (./nlplan.toml).
    pub fn default_toml_path() -> PathBuf {
        PathBuf::from("nlplan.toml")
    }

    /// Load settings from a TOML file.
    ///
    /// Returns `None` if the file doesn't exist. Returns an error only
    /// if the file exists but can't be parsed.
    pub fn load_toml(path: &std::path::Path) -> Result<Option<Self>, String> {
        let data = match std::fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("failed to read {}: {}", path.display(), e)),
        };

        let settings: Self = toml::from_str(&data)
            .map_err(|e| format!("invalid TOML in {}: {}", path.display(), e))?;
        Ok(Some(settings))
    }

    /// Merge values from `other` into `self`, preferring `other` for
    /// fields that differ from the default.
    pub fn merge_from(&mut self, other: &Self) {
        let default_json = match serde_json::to_value(Self::default()) {
            Ok(v) => v,
            Err(_) => return,
        };
        let other_json = match serde_json::to_value(other) {
            Ok(v) => v,
            Err(_) => return,
        };
        let mut self_json = match serde_json::to_value(&*self) {
            Ok(v) => v,
            Err(_) => return,
        };

        merge_non_default(&mut self_json, &other_json, &default_json);

        if let Ok(merged) = serde_json::from_value(self_json) {
            *self = merged;
        }
    }
}

/// Recursively merge `other` into `target`, but only for fields where
/// `other` differs from `defaults`.
fn merge_non_default(
    target: &mut serde_json::Value,
    other: &serde_json::Value,
    defaults: &serde_json::Value,
) {
    match (target, other, defaults) {
        (
            serde_json::Value::Object(t),
            serde_json::Value::Object(o),
            serde_json::Value::Object(d),
        ) => {
            for (key, other_val) in o {
                let default_val = d.get(key).cloned().unwrap_or(serde_json::Value::Null);
                if let Some(target_val) = t.get_mut(key) {
                    merge_non_default(target_val, other_val, &default_val);
                } else if other_val != &default_val {
                    t.insert(key.clone(), other_val.clone());
                }
            }
        }
        (target, other, defaults) => {
            if other != defaults {
                *target = other.clone();
            }
        }
    }
}
