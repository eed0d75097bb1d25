//! Entity extraction backed by a language model.

mod anthropic;
mod extractor;
mod prompt;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ExtractionError;

pub use self::anthropic::{AnthropicClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use self::extractor::{EntityExtractor, LlmEntityExtractor, MAX_OUTPUT_TOKENS};
pub use self::prompt::{MAX_INPUT_CHARS, build_user_message, parse_entities};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// One provider call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Text completion provider. Returns the first text block.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ExtractionError>;
}
