//! tracing-subscriber setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::config::helpers::normalize_variant;
use crate::error::ConfigError;

pub const DEFAULT_FILTER: &str = "nlplan=info,tower_http=info";

/// Default filter for one-shot CLI runs, where stdout carries the result.
pub const CLI_FILTER: &str = "nlplan=warn";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    pub(crate) fn parse(value: &str, key: &str) -> Result<Self, ConfigError> {
        match normalize_variant(value).as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected 'json' or 'pretty', got '{value}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogWriter {
    Stdout,
    Stderr,
}

/// Subscriber settings shared by every entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingOptions {
    pub format: LogFormat,
    pub writer: LogWriter,
    /// Used when `RUST_LOG` is unset or invalid.
    pub default_filter: &'static str,
}

impl TracingOptions {
    /// Long-running HTTP service.
    pub fn service(format: LogFormat) -> Self {
        Self {
            format,
            writer: LogWriter::Stdout,
            default_filter: DEFAULT_FILTER,
        }
    }

    /// One-shot CLI run. Logs go to stderr so stdout stays pure JSON.
    pub fn cli(format: LogFormat) -> Self {
        Self {
            format,
            writer: LogWriter::Stderr,
            default_filter: CLI_FILTER,
        }
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
///
/// Returns an error if a subscriber is already installed.
pub fn init_tracing(options: TracingOptions) -> Result<(), String> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| options.default_filter.into());
    let writer = match options.writer {
        LogWriter::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogWriter::Stderr => BoxMakeWriter::new(std::io::stderr),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);

    match options.format {
        LogFormat::Json => builder
            .json()
            .with_current_span(false)
            .try_init()
            .map_err(|e| e.to_string()),
        LogFormat::Pretty => builder.with_target(false).try_init().map_err(|e| e.to_string()),
    }
}
