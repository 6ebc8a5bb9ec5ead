//! Weaviate client over REST and GraphQL
//!
//! Collections are vectorized server-side by `text2vec-weaviate` through a
//! named vector per collection. Endpoints used:
//! - GET  /v1/.well-known/ready
//! - GET  /v1/schema/{class}, POST /v1/schema
//! - POST /v1/batch/objects
//! - POST /v1/graphql (Get with nearText, Aggregate, generative search)

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::{sort_hits, BatchOutcome, Document, SearchHit, VectorStore};
use crate::collections::CollectionSchema;
use crate::config::{LlmConfig, WeaviateConfig};
use crate::errors::{JudgeError, Result};

const BACKEND: &str = "weaviate";

pub struct WeaviateStore {
    client: Client,
    base_url: String,
    vectorizer_model: String,
}

/// Cloud URLs are often given without a scheme
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| JudgeError::ConfigError(format!("Invalid header value: {}", e)))
}

impl WeaviateStore {
    pub fn new(config: &WeaviateConfig, llm: &LlmConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", key))?);
        }
        if config.forward_provider_keys {
            if let Some(key) = llm.openai_api_key.as_deref() {
                headers.insert("X-OpenAI-Api-Key", header_value(key)?);
            }
            if let Some(key) = llm.anthropic_api_key.as_deref() {
                headers.insert("X-Anthropic-Api-Key", header_value(key)?);
            }
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(JudgeError::HttpError)?;

        Ok(Self {
            client,
            base_url: normalize_url(&config.url),
            vectorizer_model: config.vectorizer_model.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn error_body(response: reqwest::Response) -> String {
        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        format!("HTTP {}: {}", status, text)
    }

    async fn graphql(&self, query: String) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}/v1/graphql", self.base_url))
            .json(&json!({ "query": query }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(JudgeError::store(BACKEND, Self::error_body(response).await));
        }

        let body: Value = response.json().await?;
        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let messages: Vec<&str> = errors
                    .iter()
                    .filter_map(|e| e.get("message").and_then(Value::as_str))
                    .collect();
                return Err(JudgeError::store(BACKEND, messages.join("; ")));
            }
        }
        Ok(body)
    }
}

/// Class definition for POST /v1/schema
pub fn schema_body(schema: &CollectionSchema, vectorizer_model: &str) -> Value {
    let properties: Vec<Value> = schema
        .properties
        .iter()
        .map(|p| json!({ "name": p.name, "dataType": [p.data_type.as_weaviate()] }))
        .collect();

    let mut vector_config = Map::new();
    vector_config.insert(
        schema.vector_name.clone(),
        json!({
            "vectorizer": {
                "text2vec-weaviate": {
                    "properties": schema.source_properties,
                    "model": vectorizer_model,
                }
            },
            "vectorIndexType": "hnsw",
        }),
    );

    json!({
        "class": schema.name,
        "properties": properties,
        "vectorConfig": vector_config,
    })
}

/// GraphQL string literal (JSON escaping is compatible)
fn gql_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn near_text_clause(schema: &CollectionSchema, query: &str, limit: usize) -> String {
    format!(
        "nearText: {{concepts: [{}], targetVectors: [{}]}}, limit: {}",
        gql_string(query),
        gql_string(&schema.vector_name),
        limit
    )
}

pub fn near_text_query(schema: &CollectionSchema, query: &str, limit: usize) -> String {
    let fields: Vec<&str> = schema.property_names().collect();
    format!(
        "{{ Get {{ {}({}) {{ {} _additional {{ id distance certainty }} }} }} }}",
        schema.name,
        near_text_clause(schema, query, limit),
        fields.join(" ")
    )
}

pub fn generate_query(schema: &CollectionSchema, query: &str, limit: usize, task: &str) -> String {
    let fields: Vec<&str> = schema.property_names().collect();
    format!(
        "{{ Get {{ {}({}) {{ {} _additional {{ generate(groupedResult: {{task: {}}}) {{ groupedResult error }} }} }} }} }}",
        schema.name,
        near_text_clause(schema, query, limit),
        fields.join(" "),
        gql_string(task)
    )
}

pub fn aggregate_query(schema: &CollectionSchema) -> String {
    format!("{{ Aggregate {{ {} {{ meta {{ count }} }} }} }}", schema.name)
}

fn get_objects<'a>(body: &'a Value, class: &str) -> Result<&'a Vec<Value>> {
    body.pointer(&format!("/data/Get/{}", class))
        .and_then(Value::as_array)
        .ok_or_else(|| JudgeError::store(BACKEND, format!("no results block for {}", class)))
}

fn as_f32(value: Option<&Value>) -> Option<f32> {
    value.and_then(Value::as_f64).map(|v| v as f32)
}

/// Turn a Get response into hits; certainty is the score
pub fn parse_get_response(body: &Value, class: &str) -> Result<Vec<SearchHit>> {
    let objects = get_objects(body, class)?;

    let mut hits: Vec<SearchHit> = objects
        .iter()
        .filter_map(Value::as_object)
        .map(|obj| {
            let additional = obj.get("_additional");
            let distance = as_f32(additional.and_then(|a| a.get("distance")));
            let certainty = as_f32(additional.and_then(|a| a.get("certainty")));
            let score = certainty
                .or_else(|| distance.map(|d| 1.0 - d / 2.0))
                .unwrap_or(0.0)
                .clamp(0.0, 1.0);
            let id = additional
                .and_then(|a| a.get("id"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            let properties: Map<String, Value> = obj
                .iter()
                .filter(|(key, _)| key.as_str() != "_additional")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();

            SearchHit {
                id,
                properties,
                score,
                distance,
            }
        })
        .collect();

    sort_hits(&mut hits);
    Ok(hits)
}

/// Grouped generative output sits on the first object
pub fn parse_generate_response(body: &Value, class: &str) -> Result<String> {
    let objects = get_objects(body, class)?;
    let generate = objects
        .first()
        .and_then(|obj| obj.pointer("/_additional/generate"))
        .ok_or_else(|| JudgeError::store(BACKEND, "no objects matched the query"))?;

    if let Some(error) = generate.get("error").and_then(Value::as_str) {
        if !error.is_empty() {
            return Err(JudgeError::store(BACKEND, error.to_string()));
        }
    }

    generate
        .get("groupedResult")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| JudgeError::store(BACKEND, "generative module returned no result"))
}

pub fn parse_aggregate_response(body: &Value, class: &str) -> Result<u64> {
    body.pointer(&format!("/data/Aggregate/{}/0/meta/count", class))
        .and_then(Value::as_u64)
        .ok_or_else(|| JudgeError::store(BACKEND, format!("no count for {}", class)))
}

/// Collect per-object errors from a batch response
pub fn parse_batch_response(body: &Value, submitted: usize) -> BatchOutcome {
    let Some(results) = body.as_array() else {
        return BatchOutcome {
            inserted: 0,
            errors: vec![format!("unexpected batch response: {}", body)],
        };
    };

    let mut outcome = BatchOutcome::default();
    for result in results {
        let messages: Vec<String> = result
            .pointer("/result/errors/error")
            .and_then(Value::as_array)
            .map(|errors| {
                errors
                    .iter()
                    .filter_map(|e| e.get("message").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if messages.is_empty() {
            outcome.inserted += 1;
        } else {
            outcome.errors.push(messages.join("; "));
        }
    }

    // Objects the server never acknowledged
    let acknowledged = results.len();
    if acknowledged < submitted {
        outcome.errors.extend(
            std::iter::repeat("object missing from batch response".to_string())
                .take(submitted - acknowledged),
        );
    }
    outcome
}

#[async_trait]
impl VectorStore for WeaviateStore {
    fn backend_name(&self) -> &str {
        BACKEND
    }

    async fn is_ready(&self) -> Result<bool> {
        match self
            .client
            .get(format!("{}/v1/.well-known/ready", self.base_url))
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                warn!("Weaviate readiness check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn ensure_collection(&self, schema: &CollectionSchema) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/v1/schema/{}", self.base_url, schema.name))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                debug!(collection = %schema.name, "collection already exists");
                return Ok(());
            }
            StatusCode::NOT_FOUND => {}
            _ => return Err(JudgeError::store(BACKEND, Self::error_body(response).await)),
        }

        let response = self
            .client
            .post(format!("{}/v1/schema", self.base_url))
            .json(&schema_body(schema, &self.vectorizer_model))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(JudgeError::store(BACKEND, Self::error_body(response).await));
        }
        debug!(collection = %schema.name, "collection created");
        Ok(())
    }

    async fn insert_batch(
        &self,
        schema: &CollectionSchema,
        documents: Vec<Document>,
    ) -> Result<BatchOutcome> {
        if documents.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let submitted = documents.len();
        let objects: Vec<Value> = documents
            .into_iter()
            .map(|d| json!({ "class": schema.name, "properties": d.properties }))
            .collect();

        let response = self
            .client
            .post(format!("{}/v1/batch/objects", self.base_url))
            .json(&json!({ "objects": objects }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(JudgeError::store(BACKEND, Self::error_body(response).await));
        }

        let body: Value = response.json().await?;
        Ok(parse_batch_response(&body, submitted))
    }

    async fn near_text(
        &self,
        schema: &CollectionSchema,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let body = self.graphql(near_text_query(schema, query, limit)).await?;
        parse_get_response(&body, &schema.name)
    }

    async fn count(&self, schema: &CollectionSchema) -> Result<u64> {
        let body = self.graphql(aggregate_query(schema)).await?;
        parse_aggregate_response(&body, &schema.name)
    }

    async fn generate_grouped(
        &self,
        schema: &CollectionSchema,
        query: &str,
        limit: usize,
        task: &str,
    ) -> Result<String> {
        let body = self
            .graphql(generate_query(schema, query, limit, task))
            .await?;
        parse_generate_response(&body, &schema.name)
    }
}
