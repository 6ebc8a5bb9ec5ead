//! Vector database backends
//!
//! - Weaviate: hosted cluster, server-side vectorization (REST + GraphQL)
//! - Qdrant: vectors computed client-side through an `Embedder`
//! - Memory: process-local index for offline use and tests

pub mod memory;
pub mod qdrant;
pub mod weaviate;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::collections::CollectionSchema;
use crate::config::{Backend, Config};
use crate::embedding::{Embedder, HashEmbedder, OpenAiEmbedder};
use crate::errors::{JudgeError, Result};

pub use memory::MemoryStore;
pub use qdrant::QdrantStore;
pub use weaviate::WeaviateStore;

/// Object to insert: the collection's properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub properties: Map<String, Value>,
}

impl Document {
    pub fn new(properties: Map<String, Value>) -> Self {
        Self { properties }
    }
}

/// One near-text result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub properties: Map<String, Value>,
    /// Similarity in [0, 1], higher is closer
    pub score: f32,
    pub distance: Option<f32>,
}

impl SearchHit {
    /// String property, empty when missing or not a string
    pub fn text(&self, key: &str) -> &str {
        self.properties
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or("")
    }
}

/// Result of one batch insert; object-level failures do not fail the call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub inserted: usize,
    pub errors: Vec<String>,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    fn backend_name(&self) -> &str;

    async fn is_ready(&self) -> Result<bool>;

    /// Create the collection when missing; existing collections are left alone
    async fn ensure_collection(&self, schema: &CollectionSchema) -> Result<()>;

    async fn insert_batch(
        &self,
        schema: &CollectionSchema,
        documents: Vec<Document>,
    ) -> Result<BatchOutcome>;

    /// Closest objects to `query`, best first
    async fn near_text(
        &self,
        schema: &CollectionSchema,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>>;

    async fn count(&self, schema: &CollectionSchema) -> Result<u64>;

    /// Run a single generative task over the top `limit` hits
    async fn generate_grouped(
        &self,
        _schema: &CollectionSchema,
        _query: &str,
        _limit: usize,
        _task: &str,
    ) -> Result<String> {
        Err(JudgeError::Unsupported {
            backend: self.backend_name().to_string(),
            operation: "grouped generative search".to_string(),
        })
    }
}

/// Sort hits best first
pub(crate) fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Snapshot file of the memory backend, under the state directory
pub const MEMORY_SNAPSHOT: &str = "memory_store.json";

/// Build the configured backend
pub async fn build_store(config: &Config) -> Result<Arc<dyn VectorStore>> {
    match config.store.backend {
        Backend::Weaviate => {
            let store = WeaviateStore::new(&config.weaviate, &config.llm)?;
            Ok(Arc::new(store))
        }
        Backend::Qdrant => {
            let embedder: Arc<dyn Embedder> = Arc::new(OpenAiEmbedder::new(
                &config.embedding,
                config.llm.openai_api_key.as_deref(),
            )?);
            let store = QdrantStore::new(&config.qdrant, embedder)?;
            Ok(Arc::new(store))
        }
        Backend::Memory => {
            let embedder = Arc::new(HashEmbedder::default());
            let path = config.state_dir().join(MEMORY_SNAPSHOT);
            Ok(Arc::new(MemoryStore::open(embedder, path).await?))
        }
    }
}
