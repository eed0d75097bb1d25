use std::str::FromStr;

use crate::error::ConfigError;

/// Read an env var, treating unset and empty as `None`.
pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value.trim().to_string())),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be valid UTF-8".to_string(),
        }),
    }
}

/// Parse an env var into `T`, falling back to `default` when unset.
pub(crate) fn parse_env<T>(key: &str, default: T, expected: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)?
        .map(|s| s.parse::<T>())
        .transpose()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("must be {expected}: {e}"),
        })
        .map(|value| value.unwrap_or(default))
}

pub(crate) fn require_positive(key: &str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be > 0".to_string(),
        });
    }
    Ok(value)
}

/// External endpoints must be https, or plain http on a loopback host.
pub(crate) fn validate_endpoint_url(key: &str, endpoint_url: &str) -> Result<String, ConfigError> {
    check_endpoint(endpoint_url).map_err(|message| ConfigError::InvalidValue {
        key: key.to_string(),
        message,
    })?;
    Ok(endpoint_url.to_string())
}

fn check_endpoint(endpoint_url: &str) -> Result<(), String> {
    let parsed = url::Url::parse(endpoint_url).map_err(|e| format!("URL parse failed: {e}"))?;

    if !parsed.username().is_empty() || parsed.password().is_some() {
        return Err("URL contains userinfo (@), which is not allowed".to_string());
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| "URL is missing host".to_string())?
        .trim_matches(['[', ']'])
        .to_ascii_lowercase();

    match parsed.scheme() {
        "https" => Ok(()),
        "http" if is_loopback(&host) => Ok(()),
        scheme => Err(format!(
            "scheme '{scheme}' is not allowed (https, or http for loopback hosts)"
        )),
    }
}

fn is_loopback(host: &str) -> bool {
    host == "localhost"
        || host
            .parse::<std::net::IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false)
}

pub(crate) fn normalize_variant(value: &str) -> String {
    value.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_rules() {
        assert!(check_endpoint("https://quote-api.jup.ag/v6/quote").is_ok());
        assert!(check_endpoint("http://127.0.0.1:8080/quote").is_ok());
        assert!(check_endpoint("http://localhost:9000").is_ok());
        assert!(check_endpoint("http://[::1]:9000").is_ok());

        assert!(check_endpoint("http://quote-api.jup.ag/v6/quote").is_err());
        assert!(check_endpoint("https://user:pw@token.jup.ag/all").is_err());
        assert!(check_endpoint("ftp://token.jup.ag/all").is_err());
        assert!(check_endpoint("not a url").is_err());
    }

    #[test]
    fn invalid_endpoint_names_the_key() {
        let err = validate_endpoint_url("QUOTE_API_URL", "http://example.com").unwrap_err();
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "QUOTE_API_URL"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_is_rejected_where_positive_required() {
        assert!(require_positive("PORT", 0).is_err());
        assert_eq!(require_positive("PORT", 3).unwrap(), 3);
    }

    #[test]
    fn variants_are_normalized() {
        assert_eq!(normalize_variant(" Pretty "), "pretty");
        assert_eq!(normalize_variant("JSON-lines"), "json_lines");
    }
}
