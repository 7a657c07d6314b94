pub mod bedrock;

use std::sync::Arc;
use std::time::Duration;
use anyhow::{bail, Result};
use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{Config, ModelConfig};
use crate::web::models::{Message, Role};
use bedrock::BedrockModel;

/// Failures of a single model call, already classified by the provider adapter.
/// Every variant keeps the raw provider code for diagnostics.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("access denied ({code}): {message}")]
    AccessDenied { code: String, message: String },

    #[error("throttled ({code}): {message}")]
    Throttled { code: String, message: String },

    #[error("payload rejected ({code}): {message}")]
    InvalidPayload { code: String, message: String },

    #[error("provider error ({code}): {message}")]
    Unavailable { code: String, message: String },

    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected model reply: {0}")]
    Protocol(String),
}

impl ModelError {
    pub fn code(&self) -> &str {
        match self {
            ModelError::AccessDenied { code, .. }
            | ModelError::Throttled { code, .. }
            | ModelError::InvalidPayload { code, .. }
            | ModelError::Unavailable { code, .. } => code,
            ModelError::Timeout(_) => "Timeout",
            ModelError::Protocol(_) => "UnexpectedReply",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: Vec<TextBlock>,
}

impl From<Message> for PromptMessage {
    fn from(message: Message) -> Self {
        Self {
            role: message.role,
            content: vec![TextBlock { text: message.content }],
        }
    }
}

/// Everything sent to the hosted model for one turn. The system prompt is
/// carried separately from the message list.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub system: String,
    pub messages: Vec<PromptMessage>,
    pub max_tokens: i32,
    pub temperature: f64,
    pub top_p: f64,
    pub stop_sequences: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplyBlock {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

/// Decoded model reply, before any interpretation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelReply {
    #[serde(default)]
    pub content: Vec<ReplyBlock>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl ModelReply {
    pub fn into_completion(self) -> Result<Completion, ModelError> {
        if self.content.is_empty() {
            return Err(ModelError::Protocol("reply has no content blocks".to_string()));
        }

        let text = self
            .content
            .into_iter()
            .find_map(|block| match block.kind.as_deref() {
                None | Some("text") => block.text,
                _ => None,
            })
            .ok_or_else(|| ModelError::Protocol("reply has no text block".to_string()))?;

        let usage = self.usage.unwrap_or_default();
        Ok(Completion {
            text,
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        })
    }
}

/// The seam between the chat handler and a hosted model provider.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelReply, ModelError>;
}

// Holds the configured client plus the immutable settings used to build prompts
pub struct ModelManager {
    pub model: Arc<dyn ModelClient>,
    settings: ModelConfig,
    system_prompt: String,
}

impl ModelManager {
    pub async fn new(config: &Config) -> Result<Self> {
        if config.model.model_id.trim().is_empty() {
            bail!("MODEL_ID must not be empty");
        }
        if config.model.max_tokens <= 0 {
            bail!("MAX_TOKENS must be positive, got {}", config.model.max_tokens);
        }

        let model = BedrockModel::new(&config.model.region, &config.model.model_id).await;
        Ok(Self::with_client(
            Arc::new(model),
            config.model.clone(),
            config.system_prompt.clone(),
        ))
    }

    pub fn with_client(
        model: Arc<dyn ModelClient>,
        settings: ModelConfig,
        system_prompt: String,
    ) -> Self {
        Self { model, settings, system_prompt }
    }

    pub fn model_label(&self) -> &str {
        &self.settings.model_label
    }

    /// History first, in the order given, then the current message as the last user turn.
    pub fn build_request(&self, history: Vec<Message>, message: &str) -> ModelRequest {
        let mut messages: Vec<PromptMessage> =
            history.into_iter().map(PromptMessage::from).collect();
        messages.push(PromptMessage::from(Message {
            role: Role::User,
            content: message.to_string(),
        }));

        ModelRequest {
            system: self.system_prompt.clone(),
            messages,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            top_p: self.settings.top_p,
            stop_sequences: self.settings.stop_sequences.clone(),
        }
    }

    /// Performs exactly one model call, bounded by the configured timeout. No retries.
    pub async fn generate_response(
        &self,
        request: &ModelRequest,
    ) -> Result<Completion, ModelError> {
        info!(
            "Invoking {} with {} messages (max_tokens: {})",
            self.settings.model_id,
            request.messages.len(),
            request.max_tokens
        );

        let timeout = self.settings.timeout;
        let reply = tokio::time::timeout(timeout, self.model.invoke(request))
            .await
            .map_err(|_| ModelError::Timeout(timeout))??;

        let completion = reply.into_completion()?;
        debug!(
            "Reply length: {} characters, tokens in/out: {}/{}",
            completion.text.len(),
            completion.input_tokens,
            completion.output_tokens
        );
        Ok(completion)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedModel;
    use super::*;

    fn manager(model: Arc<ScriptedModel>, settings: ModelConfig) -> ModelManager {
        ModelManager::with_client(model, settings, "Be a coach.".to_string())
    }

    #[test]
    fn current_message_is_appended_after_history() {
        let model = Arc::new(ScriptedModel::replying("ok", None));
        let manager = manager(model, ModelConfig::default());

        let history = vec![
            Message { role: Role::User, content: "I sell shoes".into() },
            Message { role: Role::Assistant, content: "To whom?".into() },
        ];
        let request = manager.build_request(history, "Runners");

        let turns: Vec<(Role, &str)> = request
            .messages
            .iter()
            .map(|m| (m.role, m.content[0].text.as_str()))
            .collect();
        assert_eq!(
            turns,
            vec![
                (Role::User, "I sell shoes"),
                (Role::Assistant, "To whom?"),
                (Role::User, "Runners"),
            ]
        );
        assert_eq!(request.system, "Be a coach.");
        assert_eq!(request.max_tokens, 1000);
        assert_eq!(request.temperature, 0.7);
        assert_eq!(request.top_p, 0.9);
    }

    #[test]
    fn first_text_block_is_the_reply() {
        let reply: ModelReply = serde_json::from_str(
            r#"{"content": [{"type": "text", "text": "Ask about your target market."}],
                "usage": {"input_tokens": 40, "output_tokens": 12}}"#,
        )
        .unwrap();

        let completion = reply.into_completion().unwrap();
        assert_eq!(completion.text, "Ask about your target market.");
        assert_eq!(completion.output_tokens, 12);
    }

    #[test]
    fn missing_usage_counts_zero_tokens() {
        let reply: ModelReply = serde_json::from_str(r#"{"content": [{"text": "hi"}]}"#).unwrap();
        assert_eq!(reply.into_completion().unwrap().output_tokens, 0);
    }

    #[test]
    fn empty_content_is_a_protocol_error() {
        let reply: ModelReply = serde_json::from_str(r#"{"content": [], "usage": {}}"#).unwrap();
        assert!(matches!(reply.into_completion(), Err(ModelError::Protocol(_))));

        let reply: ModelReply = serde_json::from_str(r#"{"stop_reason": "end_turn"}"#).unwrap();
        assert!(matches!(reply.into_completion(), Err(ModelError::Protocol(_))));
    }

    #[tokio::test]
    async fn slow_model_times_out() {
        let model = ScriptedModel::replying("late", Some(1)).delayed(Duration::from_secs(5));
        let model = Arc::new(model);
        let settings = ModelConfig {
            timeout: Duration::from_millis(20),
            ..ModelConfig::default()
        };
        let manager = manager(model.clone(), settings);

        let request = manager.build_request(Vec::new(), "hello");
        let err = manager.generate_response(&request).await.unwrap_err();

        assert!(matches!(err, ModelError::Timeout(_)));
        assert_eq!(err.code(), "Timeout");
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn provider_errors_are_not_retried() {
        let model = Arc::new(ScriptedModel::new(|| {
            Err(ModelError::Throttled {
                code: "ThrottlingException".into(),
                message: "Rate exceeded".into(),
            })
        }));
        let manager = manager(model.clone(), ModelConfig::default());

        let request = manager.build_request(Vec::new(), "hello");
        let err = manager.generate_response(&request).await.unwrap_err();

        assert_eq!(err.code(), "ThrottlingException");
        assert_eq!(model.call_count(), 1);
    }
}
