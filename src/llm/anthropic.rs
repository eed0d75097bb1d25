//! Anthropic Messages API client.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{CompletionClient, CompletionRequest};
use crate::error::ExtractionError;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";
const API_VERSION: &str = "2023-06-01";
const MAX_ERROR_BODY_CHARS: usize = 512;

static SECRET_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)\b(bearer)\s+[a-z0-9._\-~+/]+=*", "$1 [REDACTED]"),
        (
            r"(?i)\b(token|api[_\-]?key|secret|password)\b(\s*[:=]\s*)([^,\s]+)",
            "$1$2[REDACTED]",
        ),
        (r"(?i)\bsk-[a-z0-9\-_]{10,}", "sk-[REDACTED]"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("redaction pattern must compile"),
            replacement,
        )
    })
    .collect()
});

/// Strip credentials a provider may echo back in an error body.
fn redact_sensitive_detail(raw: &str) -> String {
    let mut value: String = raw.chars().take(MAX_ERROR_BODY_CHARS).collect();
    for (pattern, replacement) in SECRET_PATTERNS.iter() {
        value = pattern.replace_all(&value, *replacement).into_owned();
    }
    value
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: &'a [super::ChatMessage],
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(
        api_key: SecretString,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ExtractionError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.into(),
            model: model.into(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ExtractionError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system,
            messages: &request.messages,
        };

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Status {
                status: status.as_u16(),
                body: redact_sensitive_detail(&body),
            });
        }

        let parsed: MessagesResponse =
            response
                .json()
                .await
                .map_err(|e| ExtractionError::RequestFailed {
                    reason: format!("invalid messages response: {e}"),
                })?;

        Ok(parsed
            .content
            .into_iter()
            .next()
            .filter(|block| block.kind == "text")
            .and_then(|block| block.text)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, ChatRole};

    #[test]
    fn redacts_keys_and_truncates() {
        let body = format!(
            "{{\"error\":\"bad api_key: sk-ant-abcdefghijklmnop\"}} {}",
            "x".repeat(1000)
        );
        let redacted = redact_sensitive_detail(&body);
        assert!(!redacted.contains("abcdefghijklmnop"));
        assert!(redacted.chars().count() <= MAX_ERROR_BODY_CHARS + 16);
    }

    #[test]
    fn request_body_shape() {
        let messages = vec![ChatMessage {
            role: ChatRole::User,
            content: "hi".to_string(),
        }];
        let body = MessagesRequest {
            model: DEFAULT_MODEL,
            max_tokens: 512,
            temperature: 0.0,
            system: "sys",
            messages: &messages,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["max_tokens"], 512);
        assert_eq!(value["model"], "claude-haiku-4-5-20251001");
    }

    #[test]
    fn first_text_block_wins() {
        let parsed: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"{}"},{"type":"text","text":"ignored"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.content[0].text.as_deref(), Some("{}"));
    }

    #[test]
    fn messages_url_tolerates_trailing_slash() {
        let client = AnthropicClient::new(
            SecretString::from("k".to_string()),
            "http://127.0.0.1:9/",
            DEFAULT_MODEL,
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.messages_url(), "http://127.0.0.1:9/v1/messages");
    }
}
