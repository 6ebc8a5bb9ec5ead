//! Qdrant backend - vectors computed client-side
use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, value::Kind, CountPointsBuilder, CreateCollectionBuilder, Distance,
    PointId, PointStruct, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant, QdrantError};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{sort_hits, BatchOutcome, Document, SearchHit, VectorStore};
use crate::collections::CollectionSchema;
use crate::config::QdrantConfig;
use crate::embedding::Embedder;
use crate::errors::{JudgeError, Result};

const BACKEND: &str = "qdrant";

fn store_error(err: QdrantError) -> JudgeError {
    JudgeError::store(BACKEND, err.to_string())
}

/// One Qdrant collection per schema, cosine distance
pub struct QdrantStore {
    client: Qdrant,
    embedder: Arc<dyn Embedder>,
}

impl QdrantStore {
    pub fn new(config: &QdrantConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let mut builder = Qdrant::from_url(&config.url);
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            builder = builder.api_key(key);
        }
        let client = builder.build().map_err(store_error)?;

        Ok(Self { client, embedder })
    }
}

// Helper functions for type conversions
fn qdrant_to_json_value(value: &QdrantValue) -> Option<JsonValue> {
    value.kind.as_ref().and_then(|kind| match kind {
        Kind::StringValue(s) => Some(JsonValue::String(s.clone())),
        Kind::IntegerValue(i) => Some(JsonValue::Number((*i).into())),
        Kind::DoubleValue(f) => serde_json::Number::from_f64(*f).map(JsonValue::Number),
        Kind::BoolValue(b) => Some(JsonValue::Bool(*b)),
        Kind::ListValue(list) => Some(JsonValue::Array(
            list.values.iter().filter_map(qdrant_to_json_value).collect(),
        )),
        _ => None,
    })
}

fn payload_to_properties(payload: HashMap<String, QdrantValue>) -> Map<String, JsonValue> {
    payload
        .iter()
        .filter_map(|(key, value)| qdrant_to_json_value(value).map(|v| (key.clone(), v)))
        .collect()
}

fn point_id_to_string(point_id: &Option<PointId>) -> String {
    point_id
        .as_ref()
        .and_then(|id| id.point_id_options.as_ref())
        .map(|options| match options {
            PointIdOptions::Num(n) => n.to_string(),
            PointIdOptions::Uuid(u) => u.clone(),
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn backend_name(&self) -> &str {
        BACKEND
    }

    async fn is_ready(&self) -> Result<bool> {
        match self.client.health_check().await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("Qdrant health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn ensure_collection(&self, schema: &CollectionSchema) -> Result<()> {
        let exists = self
            .client
            .collection_exists(schema.name.clone())
            .await
            .map_err(store_error)?;

        if exists {
            debug!(collection = %schema.name, "collection already exists");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&schema.name).vectors_config(
                    VectorParamsBuilder::new(self.embedder.dimension() as u64, Distance::Cosine),
                ),
            )
            .await
            .map_err(store_error)?;

        debug!(collection = %schema.name, "collection created");
        Ok(())
    }

    async fn insert_batch(
        &self,
        schema: &CollectionSchema,
        documents: Vec<Document>,
    ) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();

        let (documents, texts): (Vec<Document>, Vec<String>) = documents
            .into_iter()
            .map(|d| {
                let text = schema.embedding_text(&d.properties);
                (d, text)
            })
            .filter(|(_, text)| {
                if text.is_empty() {
                    outcome
                        .errors
                        .push("object has no text in vectorized properties".to_string());
                    false
                } else {
                    true
                }
            })
            .unzip();

        if documents.is_empty() {
            return Ok(outcome);
        }

        let vectors = self.embedder.embed_batch(&texts).await?;

        let points: Vec<PointStruct> = documents
            .into_iter()
            .zip(vectors)
            .map(|(document, vector)| {
                PointStruct::new(
                    uuid::Uuid::new_v4().to_string(),
                    vector,
                    Payload::from(document.properties),
                )
            })
            .collect();
        let submitted = points.len();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&schema.name, points).wait(true))
            .await
            .map_err(store_error)?;

        outcome.inserted = submitted;
        Ok(outcome)
    }

    async fn near_text(
        &self,
        schema: &CollectionSchema,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let vector = self.embedder.embed(query).await?;

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&schema.name, vector, limit as u64).with_payload(true),
            )
            .await
            .map_err(store_error)?;

        let mut hits: Vec<SearchHit> = response
            .result
            .into_iter()
            .map(|point| SearchHit {
                id: point_id_to_string(&point.id),
                properties: payload_to_properties(point.payload),
                score: point.score.clamp(0.0, 1.0),
                distance: Some(1.0 - point.score),
            })
            .collect();

        sort_hits(&mut hits);
        Ok(hits)
    }

    async fn count(&self, schema: &CollectionSchema) -> Result<u64> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&schema.name).exact(true))
            .await
            .map_err(store_error)?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::{CollectionKind, CollectionNames};
    use crate::embedding::HashEmbedder;

    #[test]
    fn test_qdrant_value_conversion() {
        let text = QdrantValue::from("Lightning Bolt".to_string());
        assert_eq!(
            qdrant_to_json_value(&text),
            Some(JsonValue::String("Lightning Bolt".to_string()))
        );

        let number = QdrantValue::from(3i64);
        assert_eq!(qdrant_to_json_value(&number), Some(JsonValue::from(3)));
    }

    #[test]
    fn test_point_id_to_string() {
        let id = Some(PointId::from("0b6f5c1a-3a4e-4a5c-9a43-1f0d6e3b7c11".to_string()));
        assert_eq!(point_id_to_string(&id), "0b6f5c1a-3a4e-4a5c-9a43-1f0d6e3b7c11");
        assert_eq!(point_id_to_string(&None), "unknown");
    }

    #[tokio::test]
    #[ignore] // Integration test - requires Qdrant
    async fn test_insert_and_search() {
        let store = QdrantStore::new(
            &QdrantConfig::default(),
            Arc::new(HashEmbedder::new(128)),
        )
        .unwrap();
        let schema = CollectionNames::default().schema(CollectionKind::Rulings);
        store.ensure_collection(&schema).await.unwrap();

        let mut props = Map::new();
        props.insert("name".into(), JsonValue::String("Lightning Bolt".into()));
        props.insert("rulings".into(), JsonValue::String("It deals damage.".into()));
        let outcome = store
            .insert_batch(&schema, vec![Document::new(props)])
            .await
            .unwrap();
        assert_eq!(outcome.inserted, 1);

        let hits = store.near_text(&schema, "Lightning Bolt", 1).await.unwrap();
        assert_eq!(hits[0].text("name"), "Lightning Bolt");
    }
}
