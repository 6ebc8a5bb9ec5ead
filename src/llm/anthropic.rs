//! Anthropic Messages provider
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{
    status_error, GenerationConfig, LlmProvider, LlmResponse, Message, MessageRole, RetryPolicy,
};
use crate::config::LlmConfig;
use crate::errors::{JudgeError, Result};

const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
    stop_reason: Option<String>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: usize,
    output_tokens: usize,
}

impl AnthropicProvider {
    pub fn new(config: &LlmConfig, retry: RetryPolicy) -> Result<Self> {
        let api_key = config
            .anthropic_api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                JudgeError::ConfigError(
                    "Anthropic API key is required. Set ANTHROPIC_API_KEY environment variable."
                        .to_string(),
                )
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.anthropic_base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.anthropic_model.clone(),
            retry,
        })
    }

    /// System messages move to the top-level `system` field
    fn build_request<'a>(
        &'a self,
        messages: &'a [Message],
        config: &GenerationConfig,
    ) -> MessagesRequest<'a> {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();

        MessagesRequest {
            model: &self.model,
            messages: messages
                .iter()
                .filter(|m| m.role != MessageRole::System)
                .map(|m| AnthropicMessage {
                    role: match m.role {
                        MessageRole::Assistant => "assistant",
                        _ => "user",
                    },
                    content: &m.content,
                })
                .collect(),
            system: if system.is_empty() {
                None
            } else {
                Some(system.join("\n\n"))
            },
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    async fn try_request(&self, request: &MessagesRequest<'_>) -> Result<LlmResponse> {
        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error("anthropic", status, &error_text));
        }

        let body: MessagesResponse = response.json().await?;
        Ok(parse_response(body))
    }
}

fn parse_response(body: MessagesResponse) -> LlmResponse {
    let content = body
        .content
        .iter()
        .filter(|c| c.content_type == "text")
        .filter_map(|c| c.text.as_deref())
        .collect::<Vec<_>>()
        .join("");

    LlmResponse {
        content,
        model: body.model,
        prompt_tokens: body.usage.as_ref().map(|u| u.input_tokens),
        completion_tokens: body.usage.as_ref().map(|u| u.output_tokens),
        finish_reason: body.stop_reason,
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> Result<LlmResponse> {
        let request = self.build_request(messages, config);
        let response = self
            .retry
            .run("Anthropic message", || self.try_request(&request))
            .await?;

        debug!(
            model = %response.model,
            prompt_tokens = ?response.prompt_tokens,
            completion_tokens = ?response.completion_tokens,
            "anthropic completion"
        );
        Ok(response)
    }

    fn provider_name(&self) -> &str {
        "anthropic"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
