//! OpenAI Chat Completions provider
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{status_error, GenerationConfig, LlmProvider, LlmResponse, Message, RetryPolicy};
use crate::config::LlmConfig;
use crate::errors::{JudgeError, Result};

pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: String,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig, retry: RetryPolicy) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                JudgeError::ConfigError(
                    "OpenAI API key is required. Set OPENAI_API_KEY environment variable."
                        .to_string(),
                )
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.openai_model.clone(),
            retry,
        })
    }

    fn build_request<'a>(&'a self, messages: &'a [Message], config: &GenerationConfig) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.to_string(),
                    content: &m.content,
                })
                .collect(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    async fn try_request(&self, request: &ChatRequest<'_>) -> Result<LlmResponse> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error("openai", status, &error_text));
        }

        let body: ChatResponse = response.json().await?;
        parse_response(body)
    }
}

fn parse_response(body: ChatResponse) -> Result<LlmResponse> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| JudgeError::provider("openai", "response contained no choices"))?;

    Ok(LlmResponse {
        content: choice.message.content.unwrap_or_default(),
        model: body.model,
        prompt_tokens: body.usage.as_ref().map(|u| u.prompt_tokens),
        completion_tokens: body.usage.as_ref().map(|u| u.completion_tokens),
        finish_reason: choice.finish_reason,
    })
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> Result<LlmResponse> {
        let request = self.build_request(messages, config);
        let response = self
            .retry
            .run("OpenAI chat completion", || self.try_request(&request))
            .await?;

        debug!(
            model = %response.model,
            prompt_tokens = ?response.prompt_tokens,
            completion_tokens = ?response.completion_tokens,
            "openai completion"
        );
        Ok(response)
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
