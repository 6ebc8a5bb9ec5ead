//! Language model providers
//!
//! OpenAI Chat Completions and Anthropic Messages behind one trait, both
//! wrapped in the same bounded retry policy.

pub mod anthropic;
pub mod openai;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::config::{LlmConfig, ProviderKind};
use crate::errors::{JudgeError, Result};

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
pub use retry::RetryPolicy;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Sampling parameters for one request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_tokens: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 1000,
        }
    }
}

impl From<&LlmConfig> for GenerationConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub prompt_tokens: Option<usize>,
    pub completion_tokens: Option<usize>,
    pub finish_reason: Option<String>,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> Result<LlmResponse>;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}

/// Build the provider named by `kind` (or the configured default)
pub fn build_provider(
    config: &LlmConfig,
    kind: Option<ProviderKind>,
) -> Result<Arc<dyn LlmProvider>> {
    let retry = RetryPolicy::with_config(config.max_retries, 1000);
    match kind.unwrap_or(config.provider) {
        ProviderKind::OpenAi => Ok(Arc::new(OpenAiProvider::new(config, retry)?)),
        ProviderKind::Anthropic => Ok(Arc::new(AnthropicProvider::new(config, retry)?)),
    }
}

/// Map a non-success HTTP status to an error. Auth and request errors are
/// permanent; rate limits and server errors stay retryable.
pub(crate) fn status_error(provider: &str, status: reqwest::StatusCode, body: &str) -> JudgeError {
    let message = format!("HTTP {}: {}", status, body);
    match status.as_u16() {
        401 | 403 => JudgeError::ConfigError(format!("{} rejected the API key ({})", provider, message)),
        400 | 404 | 422 => JudgeError::Generic(format!("{} API error: {}", provider, message)),
        _ => JudgeError::provider(provider, message),
    }
}

/// Whether the key for `kind` is configured
pub fn has_api_key(config: &LlmConfig, kind: ProviderKind) -> bool {
    let key = match kind {
        ProviderKind::OpenAi => config.openai_api_key.as_deref(),
        ProviderKind::Anthropic => config.anthropic_api_key.as_deref(),
    };
    key.map(|k| !k.is_empty()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::JudgeError;

    #[test]
    fn test_message_role_display() {
        assert_eq!(MessageRole::System.to_string(), "system");
        assert_eq!(Message::user("hi").role, MessageRole::User);
    }

    #[test]
    fn test_build_provider_without_key_fails() {
        let config = LlmConfig::default();
        let result = build_provider(&config, Some(ProviderKind::Anthropic));
        assert!(matches!(result, Err(JudgeError::ConfigError(_))));
    }

    #[test]
    fn test_build_provider_override() {
        let config = LlmConfig {
            anthropic_api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        let provider = build_provider(&config, Some(ProviderKind::Anthropic)).unwrap();
        assert_eq!(provider.provider_name(), "anthropic");
        assert_eq!(provider.model_name(), "claude-3-5-sonnet-latest");
    }

    #[test]
    fn test_status_error_classification() {
        let auth = status_error("openai", reqwest::StatusCode::UNAUTHORIZED, "bad key");
        assert!(!auth.is_retryable());

        let limited = status_error("openai", reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(limited.is_retryable());
        assert!(limited.to_string().contains("429"));
    }

    #[test]
    fn test_has_api_key() {
        let config = LlmConfig {
            openai_api_key: Some(String::new()),
            ..Default::default()
        };
        assert!(!has_api_key(&config, ProviderKind::OpenAi));
        assert!(!has_api_key(&config, ProviderKind::Anthropic));
    }

    #[test]
    fn test_generation_config_from_llm_section() {
        let config = LlmConfig {
            temperature: 0.4,
            max_tokens: 300,
            ..Default::default()
        };
        let generation = GenerationConfig::from(&config);
        assert_eq!(generation.temperature, 0.4);
        assert_eq!(generation.max_tokens, 300);
    }
}
