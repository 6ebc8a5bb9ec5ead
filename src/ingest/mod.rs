//! Batch import of the rulebook, cards and rulings
//!
//! Documents go to the store in fixed-size batches. Object-level failures are
//! counted across batches; once the count passes `max_errors` the import
//! stops and the report is marked aborted.

use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::collections::{CollectionKind, CollectionNames, CollectionSchema};
use crate::config::IngestConfig;
use crate::corpus::{AtomicCards, RecursiveSplitter, RuleEntry};
use crate::errors::{JudgeError, Result};
use crate::store::{Document, VectorStore};

/// Error messages kept on a report
const MAX_REPORTED_ERRORS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub collection: String,
    pub submitted: usize,
    pub inserted: usize,
    pub failed: usize,
    pub aborted: bool,
    /// First few error messages
    pub errors: Vec<String>,
}

impl IngestReport {
    fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            ..Default::default()
        }
    }

    fn record_errors(&mut self, messages: impl IntoIterator<Item = String>) {
        for message in messages {
            self.failed += 1;
            if self.errors.len() < MAX_REPORTED_ERRORS {
                self.errors.push(message);
            }
        }
    }

    /// `IngestAborted` when the import stopped early
    pub fn ensure_complete(&self, limit: usize) -> Result<()> {
        if self.aborted {
            return Err(JudgeError::IngestAborted {
                collection: self.collection.clone(),
                errors: self.failed,
                limit,
            });
        }
        Ok(())
    }
}

pub struct Ingestor {
    store: Arc<dyn VectorStore>,
    config: IngestConfig,
    progress: Option<ProgressBar>,
}

impl Ingestor {
    pub fn new(store: Arc<dyn VectorStore>, config: IngestConfig) -> Self {
        Self {
            store,
            config,
            progress: None,
        }
    }

    /// Advance `progress` by the size of each batch sent
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ensure all three collections exist
    pub async fn create_schemas(&self, names: &CollectionNames) -> Result<Vec<CollectionSchema>> {
        let mut schemas = Vec::with_capacity(3);
        for kind in CollectionKind::all() {
            let schema = names.schema(kind);
            self.store.ensure_collection(&schema).await?;
            info!(collection = %schema.name, backend = self.store.backend_name(), "collection ready");
            schemas.push(schema);
        }
        Ok(schemas)
    }

    /// Rule documents; oversized blocks are split, each chunk keeping the
    /// block's rule number and section
    pub fn rule_documents(&self, entries: &[RuleEntry]) -> Vec<Document> {
        let splitter = RecursiveSplitter::new(self.config.max_chunk_chars, self.config.chunk_overlap);
        let mut documents = Vec::with_capacity(entries.len());

        for entry in entries {
            if entry.rule.chars().count() <= self.config.max_chunk_chars {
                documents.push(Document::new(entry.to_properties()));
                continue;
            }
            for chunk in splitter.split(&entry.rule) {
                let piece = RuleEntry {
                    rule: chunk,
                    rule_number: entry.rule_number.clone(),
                    section: entry.section.clone(),
                };
                documents.push(Document::new(piece.to_properties()));
            }
        }
        documents
    }

    pub async fn ingest_rules(
        &self,
        schema: &CollectionSchema,
        entries: &[RuleEntry],
    ) -> Result<IngestReport> {
        let documents = self.rule_documents(entries);
        self.import(schema, documents).await
    }

    pub async fn ingest_cards(
        &self,
        schema: &CollectionSchema,
        cards: &AtomicCards,
    ) -> Result<IngestReport> {
        let documents = cards
            .card_records()
            .map(|record| Document::new(record.to_properties()))
            .collect();
        self.import(schema, documents).await
    }

    /// Cards without a rulings key are skipped
    pub async fn ingest_rulings(
        &self,
        schema: &CollectionSchema,
        cards: &AtomicCards,
    ) -> Result<IngestReport> {
        let documents = cards
            .ruling_records()
            .map(|record| Document::new(record.to_properties()))
            .collect();
        self.import(schema, documents).await
    }

    /// Send `documents` in batches. A batch call that fails outright counts
    /// every object in it as failed.
    pub async fn import(
        &self,
        schema: &CollectionSchema,
        documents: Vec<Document>,
    ) -> Result<IngestReport> {
        let mut report = IngestReport::new(&schema.name);
        let batch_size = self.config.batch_size.max(1);

        if let Some(pb) = &self.progress {
            pb.reset();
            pb.set_length(documents.len() as u64);
            pb.set_position(0);
            pb.set_message(schema.name.clone());
        }

        let mut remaining = documents.into_iter().peekable();
        while remaining.peek().is_some() {
            let batch: Vec<Document> = remaining.by_ref().take(batch_size).collect();
            let size = batch.len();
            report.submitted += size;

            match self.store.insert_batch(schema, batch).await {
                Ok(outcome) => {
                    report.inserted += outcome.inserted;
                    report.record_errors(outcome.errors);
                }
                Err(e) => {
                    warn!(collection = %schema.name, "batch of {} failed: {}", size, e);
                    let message = e.to_string();
                    report.record_errors(std::iter::repeat(message).take(size));
                }
            }

            if let Some(pb) = &self.progress {
                pb.inc(size as u64);
            }

            if report.failed > self.config.max_errors {
                error!(
                    collection = %schema.name,
                    failed = report.failed,
                    "Batch import stopped due to excessive errors."
                );
                report.aborted = true;
                break;
            }
        }

        if let Some(pb) = &self.progress {
            pb.finish_with_message(format!("{} done", schema.name));
        }

        if !report.errors.is_empty() {
            warn!(
                collection = %schema.name,
                failed = report.failed,
                first_error = %report.errors[0],
                "objects failed to import"
            );
        }
        info!(
            collection = %schema.name,
            submitted = report.submitted,
            inserted = report.inserted,
            failed = report.failed,
            "import finished"
        );
        Ok(report)
    }
}
