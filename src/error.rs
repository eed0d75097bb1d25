//! Error types for nlplan.

use serde::Serialize;

/// Top-level error type for the planner service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Quote error: {0}")]
    Quote(#[from] QuoteError),

    #[error("Token list error: {0}")]
    TokenList(#[from] TokenListError),

    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request validation failures. Rejected before any collaborator runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Missing or invalid \"prompt\" field")]
    MissingPrompt,

    #[error("Prompt cannot be empty")]
    EmptyPrompt,

    #[error("Invalid \"wallet\" field — must be a string")]
    InvalidWallet,

    #[error("Invalid \"constraints\" field — must be an object")]
    InvalidConstraints,

    #[error("Invalid constraints: {0}")]
    MalformedConstraints(String),

    #[error("Invalid JSON body: {0}")]
    InvalidBody(String),

    #[error("Request body too large")]
    BodyTooLarge,
}

/// Entity extraction failures (language-model collaborator).
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Entity extraction service unavailable (no API key configured)")]
    NotConfigured,

    #[error("Entity extraction API error: {reason}")]
    RequestFailed { reason: String },

    #[error("Entity extraction API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse entity extraction response after retry")]
    Unparseable,

    #[error("Entity extraction API error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Quote service failures. Degrade enrichment, never fail a plan.
#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error("Jupiter API returned {status}")]
    Status { status: u16 },

    #[error("Jupiter fetch failed: {0}")]
    Transport(String),

    #[error("Jupiter fetch failed: invalid quote payload: {0}")]
    Decode(String),

    #[error("Quote amount cannot be expressed in base units: {0}")]
    InvalidAmount(String),
}

impl From<reqwest::Error> for QuoteError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

/// Token list service failures. Swallowed by registry refresh.
#[derive(Debug, thiserror::Error)]
pub enum TokenListError {
    #[error("token list service returned HTTP {status}")]
    Status { status: u16 },

    #[error("token list request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// HTTP listener failures.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway failed to start: {reason}")]
    StartupFailed { reason: String },

    #[error("Gateway server error: {0}")]
    Serve(String),
}

/// Failures surfaced by the planning pipeline to its caller.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("internal pipeline failure: {0}")]
    Internal(String),
}

/// Machine-readable failure class rendered in error bodies.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidInput,
    BodyTooLarge,
    RateLimited,
    ServiceUnavailable,
    ExtractionFailed,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::BodyTooLarge => "BODY_TOO_LARGE",
            Self::RateLimited => "RATE_LIMITED",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::ExtractionFailed => "EXTRACTION_FAILED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl PlanError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Input(InputError::BodyTooLarge) => ErrorCode::BodyTooLarge,
            Self::Input(_) => ErrorCode::InvalidInput,
            Self::Extraction(ExtractionError::NotConfigured) => ErrorCode::ServiceUnavailable,
            Self::Extraction(_) => ErrorCode::ExtractionFailed,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Message safe to show callers. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Input(error) => error.to_string(),
            Self::Extraction(ExtractionError::NotConfigured) => {
                ExtractionError::NotConfigured.to_string()
            }
            Self::Extraction(_) => "Failed to extract intent from prompt".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Extra detail exposed alongside the public message, if any.
    pub fn public_detail(&self) -> Option<String> {
        match self {
            Self::Extraction(ExtractionError::NotConfigured) => None,
            Self::Extraction(error) => Some(error.to_string()),
            _ => None,
        }
    }
}
