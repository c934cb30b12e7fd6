//! Scripted provider: replays a fixed list of replies.
//!
//! Used for offline play and tests. With `cycle` set the script wraps
//! around; otherwise it fails once exhausted.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;

use super::{
    factory::ProviderFactory, ChatMessage, CompletionConfig, CompletionResponse, LlmProvider,
    ProviderError, TokenUsage,
};

const DEFAULT_REPLIES: [&str; 2] = [
    "Yes.\n\nNoted.",
    "No.\n\nNoted.",
];

#[derive(Debug)]
pub struct ScriptedProvider {
    replies: Vec<String>,
    cycle: bool,
    cursor: Mutex<usize>,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            cycle: false,
            cursor: Mutex::new(0),
        }
    }

    pub fn cycling(mut self) -> Self {
        self.cycle = true;
        self
    }

    /// Replies handed out so far.
    pub fn calls(&self) -> usize {
        *self.cursor.lock()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let content = {
            let mut cursor = self.cursor.lock();
            let index = if self.cycle && !self.replies.is_empty() {
                *cursor % self.replies.len()
            } else {
                *cursor
            };
            let reply = self
                .replies
                .get(index)
                .cloned()
                .ok_or(ProviderError::ScriptExhausted(self.replies.len()))?;
            *cursor += 1;
            reply
        };

        let prompt_chars: usize = messages.iter().map(|m| m.content.len()).sum();
        Ok(CompletionResponse {
            usage: TokenUsage {
                prompt_tokens: (prompt_chars / 4) as u32,
                completion_tokens: (content.len() / 4) as u32,
            },
            content,
            model: config.model.clone(),
            stop_reason: Some("scripted".to_string()),
        })
    }

    async fn health_check(&self) -> bool {
        !self.replies.is_empty()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Factory for scripted providers.
///
/// ## Configuration Format
/// ```json
/// {
///   "replies": ["Yes.\n\nNoted.", "No.\n\nNoted."],
///   "cycle": true
/// }
/// ```
pub struct ScriptedProviderFactory;

impl ProviderFactory for ScriptedProviderFactory {
    fn provider_type(&self) -> &'static str {
        "scripted"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let replies: Vec<String> = match config["replies"].as_array() {
            Some(items) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            None => DEFAULT_REPLIES.iter().map(|s| s.to_string()).collect(),
        };

        let provider = ScriptedProvider::new(replies);
        let provider = if config["cycle"].as_bool().unwrap_or(true) {
            provider.cycling()
        } else {
            provider
        };
        Ok(Arc::new(provider))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        match &config["replies"] {
            JsonValue::Null => Ok(()),
            JsonValue::Array(items) if items.iter().all(JsonValue::is_string) => Ok(()),
            _ => Err(ProviderError::NotConfigured(
                "scripted 'replies' must be a list of strings".to_string(),
            )),
        }
    }

    fn description(&self) -> &'static str {
        "Replays fixed replies for offline runs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_then_fails() {
        let provider = ScriptedProvider::new(["Yes.", "No."]);
        let config = CompletionConfig::default();

        let first = provider.complete(vec![], &config).await.unwrap();
        let second = provider.complete(vec![], &config).await.unwrap();
        assert_eq!(first.content, "Yes.");
        assert_eq!(second.content, "No.");
        assert!(matches!(
            provider.complete(vec![], &config).await,
            Err(ProviderError::ScriptExhausted(2))
        ));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_cycling_wraps_around() {
        let provider = ScriptedProvider::new(["A", "B"]).cycling();
        let config = CompletionConfig::default();
        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(provider.complete(vec![], &config).await.unwrap().content);
        }
        assert_eq!(seen, vec!["A", "B", "A"]);
    }

    #[test]
    fn test_factory_validates_replies() {
        let factory = ScriptedProviderFactory;
        assert!(factory.validate_config(&serde_json::json!({})).is_ok());
        assert!(factory
            .validate_config(&serde_json::json!({"replies": ["Yes."]}))
            .is_ok());
        assert!(factory
            .validate_config(&serde_json::json!({"replies": [1, 2]}))
            .is_err());
    }

    #[tokio::test]
    async fn test_factory_default_script_is_healthy() {
        let provider = ScriptedProviderFactory
            .create(&serde_json::json!({}))
            .unwrap();
        assert!(provider.health_check().await);
        assert_eq!(provider.name(), "scripted");
    }
}
