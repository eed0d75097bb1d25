//! Prompt-to-entities extraction with one corrective retry.

use std::sync::Arc;

use async_trait::async_trait;

use super::prompt::{
    RETRY_ASSISTANT_TURN, RETRY_USER_TURN, SYSTEM_PROMPT, build_user_message, parse_entities,
};
use super::{ChatMessage, CompletionClient, CompletionRequest};
use crate::error::ExtractionError;
use crate::planner::types::{Constraints, ExtractedEntities};

pub const MAX_OUTPUT_TOKENS: u32 = 512;

/// Natural language to structured entities.
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    async fn extract(
        &self,
        prompt: &str,
        constraints: Option<&Constraints>,
    ) -> Result<ExtractedEntities, ExtractionError>;
}

pub struct LlmEntityExtractor {
    client: Arc<dyn CompletionClient>,
}

impl LlmEntityExtractor {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    fn request(messages: Vec<ChatMessage>) -> CompletionRequest {
        CompletionRequest {
            system: SYSTEM_PROMPT.to_string(),
            messages,
            max_tokens: MAX_OUTPUT_TOKENS,
            temperature: 0.0,
        }
    }
}

#[async_trait]
impl EntityExtractor for LlmEntityExtractor {
    async fn extract(
        &self,
        prompt: &str,
        constraints: Option<&Constraints>,
    ) -> Result<ExtractedEntities, ExtractionError> {
        let user_message = build_user_message(prompt, constraints);

        let first = Self::request(vec![ChatMessage::user(user_message.clone())]);
        let text = self.client.complete(&first).await?;
        if let Some(entities) = parse_entities(&text) {
            return Ok(entities);
        }
        tracing::debug!(response_len = text.len(), "extraction output unparseable, retrying");

        // Provider errors on the retry are surfaced as-is.
        let retry = Self::request(vec![
            ChatMessage::user(user_message),
            ChatMessage::assistant(RETRY_ASSISTANT_TURN),
            ChatMessage::user(RETRY_USER_TURN),
        ]);
        let text = self.client.complete(&retry).await?;
        parse_entities(&text).ok_or(ExtractionError::Unparseable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatRole;
    use crate::planner::types::ActionType;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const VALID: &str = r#"{"action_type":"stake","tokens":[],"amounts":[{"value":10,"ticker":"SOL"}],"destination":null,"slippage_bps":null,"priority_fee_lamports":null,"protocol_preference":"marinade","raw_confidence":0.9}"#;

    struct ScriptedClient {
        replies: Mutex<VecDeque<Result<String, ExtractionError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Result<String, ExtractionError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, ExtractionError> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ExtractionError::Unparseable))
        }
    }

    #[tokio::test]
    async fn valid_first_reply_needs_one_call() {
        let client = ScriptedClient::new(vec![Ok(VALID.to_string())]);
        let extractor = LlmEntityExtractor::new(client.clone());

        let entities = extractor.extract("stake 10 sol", None).await.unwrap();

        assert_eq!(entities.action_type, ActionType::Stake);
        assert_eq!(client.calls(), 1);
        let request = &client.requests.lock().unwrap()[0];
        assert_eq!(request.max_tokens, 512);
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.messages[0].content, "User prompt: \"stake 10 sol\"");
    }

    #[tokio::test]
    async fn malformed_reply_is_retried_once_with_correction() {
        let client = ScriptedClient::new(vec![
            Ok("Sure! You want to stake.".to_string()),
            Ok(VALID.to_string()),
        ]);
        let extractor = LlmEntityExtractor::new(client.clone());

        assert!(extractor.extract("stake 10 sol", None).await.is_ok());
        assert_eq!(client.calls(), 2);

        let retry = &client.requests.lock().unwrap()[1];
        let roles: Vec<ChatRole> = retry.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![ChatRole::User, ChatRole::Assistant, ChatRole::User]);
        assert_eq!(retry.messages[2].content, RETRY_USER_TURN);
    }

    #[tokio::test]
    async fn second_malformed_reply_gives_up() {
        let client = ScriptedClient::new(vec![Ok("nope".to_string()), Ok("still nope".to_string())]);
        let extractor = LlmEntityExtractor::new(client.clone());

        let err = extractor.extract("stake", None).await.unwrap_err();

        assert!(matches!(err, ExtractionError::Unparseable));
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn provider_error_is_not_retried() {
        let client = ScriptedClient::new(vec![Err(ExtractionError::Status {
            status: 529,
            body: "overloaded".to_string(),
        })]);
        let extractor = LlmEntityExtractor::new(client.clone());

        let err = extractor.extract("stake", None).await.unwrap_err();

        assert!(matches!(err, ExtractionError::Status { status: 529, .. }));
        assert_eq!(client.calls(), 1);
    }
}
