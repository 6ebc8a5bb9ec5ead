// Retrieval across the rules, cards and rulings collections
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::collections::{CollectionKind, CollectionNames, CollectionSchema};
use crate::config::RetrievalConfig;
use crate::store::{SearchHit, VectorStore};

/// Per-collection result limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchLimits {
    pub rules: usize,
    pub cards: usize,
    pub rulings: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            rules: 3,
            cards: 3,
            rulings: 3,
        }
    }
}

impl SearchLimits {
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self {
            rules: config.rules_limit,
            cards: config.cards_limit,
            rulings: config.rulings_limit,
        }
    }

    pub fn for_kind(&self, kind: CollectionKind) -> usize {
        match kind {
            CollectionKind::Rules => self.rules,
            CollectionKind::Cards => self.cards,
            CollectionKind::Rulings => self.rulings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMetadata {
    pub query: String,
    pub timestamp: DateTime<Local>,
    pub limits: SearchLimits,
    pub min_score: f32,
}

/// Filtered hits per collection, best first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub rules: Vec<SearchHit>,
    pub cards: Vec<SearchHit>,
    pub rulings: Vec<SearchHit>,
    pub metadata: SearchMetadata,
}

impl SearchResults {
    pub fn total(&self) -> usize {
        self.rules.len() + self.cards.len() + self.rulings.len()
    }
}

/// Searches the three collections of one store
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    rules: CollectionSchema,
    cards: CollectionSchema,
    rulings: CollectionSchema,
}

impl Retriever {
    pub fn new(store: Arc<dyn VectorStore>, names: &CollectionNames) -> Self {
        Self {
            store,
            rules: names.schema(CollectionKind::Rules),
            cards: names.schema(CollectionKind::Cards),
            rulings: names.schema(CollectionKind::Rulings),
        }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn schema(&self, kind: CollectionKind) -> &CollectionSchema {
        match kind {
            CollectionKind::Rules => &self.rules,
            CollectionKind::Cards => &self.cards,
            CollectionKind::Rulings => &self.rulings,
        }
    }

    /// Search all collections concurrently
    pub async fn search_all(
        &self,
        query: &str,
        limits: SearchLimits,
        min_score: f32,
    ) -> SearchResults {
        info!("Searching all collections for: '{}'", query);
        let timestamp = Local::now();

        let (rules, cards, rulings) = tokio::join!(
            self.search_one(CollectionKind::Rules, query, limits.rules, min_score),
            self.search_one(CollectionKind::Cards, query, limits.cards, min_score),
            self.search_one(CollectionKind::Rulings, query, limits.rulings, min_score),
        );

        SearchResults {
            rules,
            cards,
            rulings,
            metadata: SearchMetadata {
                query: query.to_string(),
                timestamp,
                limits,
                min_score,
            },
        }
    }

    /// Failures are logged and produce an empty list
    async fn search_one(
        &self,
        kind: CollectionKind,
        query: &str,
        limit: usize,
        min_score: f32,
    ) -> Vec<SearchHit> {
        if limit == 0 {
            return Vec::new();
        }

        let schema = self.schema(kind);
        match self.store.near_text(schema, query, limit).await {
            Ok(hits) => {
                let total = hits.len();
                let filtered: Vec<SearchHit> =
                    hits.into_iter().filter(|h| h.score >= min_score).collect();
                info!(
                    "Found {} relevant {} (from {} total)",
                    filtered.len(),
                    kind.key(),
                    total
                );
                filtered
            }
            Err(e) => {
                error!("Error searching {}: {}", kind.key(), e);
                Vec::new()
            }
        }
    }
}
