use std::net::{IpAddr, SocketAddr};

use crate::config::helpers::{optional_env, parse_env, require_positive};
use crate::error::ConfigError;
use crate::settings::Settings;

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Per-IP requests per 60 s window on `/api`. Zero disables throttling.
    pub rate_limit_rpm: u32,
    pub body_limit_bytes: usize,
}

impl ServerConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let host = optional_env("HOST")?.unwrap_or_else(|| settings.server.host.clone());
        if host.parse::<IpAddr>().is_err() && host != "localhost" {
            return Err(ConfigError::InvalidValue {
                key: "HOST".to_string(),
                message: format!("must be an IP address or 'localhost', got '{host}'"),
            });
        }

        let port = parse_env("PORT", settings.server.port, "a valid port number")?;

        let rate_limit_rpm = parse_env(
            "RATE_LIMIT_RPM",
            settings.server.rate_limit_rpm,
            "a non-negative integer",
        )?;

        let body_limit_bytes = parse_env(
            "BODY_LIMIT_BYTES",
            settings.server.body_limit_bytes as u64,
            "a positive integer",
        )?;
        let body_limit_bytes = require_positive("BODY_LIMIT_BYTES", body_limit_bytes)? as usize;

        Ok(Self {
            host,
            port,
            rate_limit_rpm,
            body_limit_bytes,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        let ip = self
            .host
            .parse::<IpAddr>()
            .unwrap_or(IpAddr::from([127, 0, 0, 1]));
        SocketAddr::new(ip, self.port)
    }
}
