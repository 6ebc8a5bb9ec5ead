//! OpenAI embeddings endpoint
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Embedder;
use crate::config::EmbeddingConfig;
use crate::errors::{JudgeError, Result};
use crate::llm::status_error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: Option<&str>) -> Result<Self> {
        let api_key = api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                JudgeError::ConfigError(
                    "OpenAI API key is required for embeddings. Set OPENAI_API_KEY.".to_string(),
                )
            })?
            .to_string();

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(JudgeError::HttpError)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            dimension: config.dimension,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Put vectors back in request order
fn order_embeddings(mut data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(JudgeError::provider(
            "openai",
            format!("expected {} embeddings, got {}", expected, data.len()),
        ));
    }
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

/// Rejected keys are configuration errors and are not retried
fn embedding_error(status: reqwest::StatusCode, body: &str) -> JudgeError {
    status_error("openai embeddings", status, body)
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(embedding_error(status, &error_text));
        }

        let parsed: EmbeddingResponse = response.json().await?;
        order_embeddings(parsed.data, texts.len())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
