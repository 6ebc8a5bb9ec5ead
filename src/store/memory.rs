//! In-process vector index
//!
//! With a snapshot path the collections are written to a JSON file after
//! every change and read back on open, so separate runs of the CLI share
//! one index.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{sort_hits, BatchOutcome, Document, SearchHit, VectorStore};
use crate::collections::CollectionSchema;
use crate::embedding::{cosine_similarity, Embedder};
use crate::errors::{JudgeError, Result};

#[derive(Serialize, Deserialize)]
struct StoredObject {
    id: String,
    properties: Map<String, Value>,
    vector: Vec<f32>,
}

/// Collections held in memory, searched by brute-force cosine similarity
pub struct MemoryStore {
    embedder: Arc<dyn Embedder>,
    collections: RwLock<HashMap<String, Vec<StoredObject>>>,
    snapshot: Option<PathBuf>,
}

type Collections = HashMap<String, Vec<StoredObject>>;

impl MemoryStore {
    /// Empty store that lives only as long as the process
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            collections: RwLock::new(HashMap::new()),
            snapshot: None,
        }
    }

    /// Store backed by the snapshot file at `path`, loaded when it exists
    pub async fn open(embedder: Arc<dyn Embedder>, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let collections: Collections = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                JudgeError::store(
                    "memory",
                    format!("corrupt snapshot {}: {}", path.display(), e),
                )
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        info!(
            snapshot = %path.display(),
            collections = collections.len(),
            "memory store opened"
        );

        Ok(Self {
            embedder,
            collections: RwLock::new(collections),
            snapshot: Some(path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    /// Write the snapshot; the file is replaced by rename
    async fn persist(&self, collections: &Collections) -> Result<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string(collections)?;
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, contents).await?;
        tokio::fs::rename(&staging, path).await?;
        Ok(())
    }

    fn missing(name: &str) -> JudgeError {
        JudgeError::store("memory", format!("collection {} does not exist", name))
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn is_ready(&self) -> Result<bool> {
        Ok(true)
    }

    async fn ensure_collection(&self, schema: &CollectionSchema) -> Result<()> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(&schema.name) {
            return Ok(());
        }
        collections.insert(schema.name.clone(), Vec::new());
        self.persist(&collections).await
    }

    async fn insert_batch(
        &self,
        schema: &CollectionSchema,
        documents: Vec<Document>,
    ) -> Result<BatchOutcome> {
        if documents.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let texts: Vec<String> = documents
            .iter()
            .map(|d| schema.embedding_text(&d.properties))
            .collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let mut collections = self.collections.write().await;
        let objects = collections
            .get_mut(&schema.name)
            .ok_or_else(|| Self::missing(&schema.name))?;

        let mut outcome = BatchOutcome::default();
        for ((document, vector), text) in documents.into_iter().zip(vectors).zip(&texts) {
            if text.is_empty() {
                outcome
                    .errors
                    .push("object has no text in vectorized properties".to_string());
                continue;
            }
            objects.push(StoredObject {
                id: uuid::Uuid::new_v4().to_string(),
                properties: document.properties,
                vector,
            });
            outcome.inserted += 1;
        }

        if outcome.inserted > 0 {
            self.persist(&collections).await?;
        }

        debug!(
            collection = %schema.name,
            inserted = outcome.inserted,
            failed = outcome.errors.len(),
            "memory batch stored"
        );
        Ok(outcome)
    }

    async fn near_text(
        &self,
        schema: &CollectionSchema,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let query_vector = self.embedder.embed(query).await?;

        let collections = self.collections.read().await;
        let objects = collections
            .get(&schema.name)
            .ok_or_else(|| Self::missing(&schema.name))?;

        let mut hits: Vec<SearchHit> = objects
            .iter()
            .map(|obj| {
                let score = cosine_similarity(&query_vector, &obj.vector).clamp(0.0, 1.0);
                SearchHit {
                    id: obj.id.clone(),
                    properties: obj.properties.clone(),
                    score,
                    distance: Some(1.0 - score),
                }
            })
            .collect();

        sort_hits(&mut hits);
        hits.truncate(limit);
        Ok(hits)
    }

    async fn count(&self, schema: &CollectionSchema) -> Result<u64> {
        let collections = self.collections.read().await;
        collections
            .get(&schema.name)
            .map(|objects| objects.len() as u64)
            .ok_or_else(|| Self::missing(&schema.name))
    }
}
