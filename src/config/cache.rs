use std::time::Duration;

use crate::config::helpers::{parse_env, require_positive};
use crate::error::ConfigError;
use crate::planner::CacheTtls;
use crate::settings::Settings;

/// Response cache sizing and freshness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttls: CacheTtls,
}

impl CacheConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let capacity = parse_env(
            "CACHE_CAPACITY",
            settings.cache.capacity as u64,
            "a positive integer",
        )?;
        let capacity = require_positive("CACHE_CAPACITY", capacity)? as usize;

        let lite = parse_env(
            "CACHE_LITE_TTL_SECS",
            settings.cache.lite_ttl_secs,
            "a positive integer",
        )?;
        let pro = parse_env(
            "CACHE_PRO_TTL_SECS",
            settings.cache.pro_ttl_secs,
            "a positive integer",
        )?;

        Ok(Self {
            capacity,
            ttls: CacheTtls {
                lite: Duration::from_secs(require_positive("CACHE_LITE_TTL_SECS", lite)?),
                pro: Duration::from_secs(require_positive("CACHE_PRO_TTL_SECS", pro)?),
            },
        })
    }
}
