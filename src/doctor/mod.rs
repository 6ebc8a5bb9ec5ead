//! Doctor command for system diagnostics
//!
//! Health checks for configuration, the vector store, its collections and
//! the provider keys.

use colored::Colorize;
use serde::Serialize;
use std::sync::Arc;

use crate::collections::CollectionKind;
use crate::config::{Backend, Config};
use crate::llm::has_api_key;
use crate::store::{build_store, VectorStore};

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

impl HealthCheck {
    fn new(name: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }
}

/// Doctor diagnostics system
pub struct Doctor {
    config: Config,
    store: Option<Arc<dyn VectorStore>>,
}

impl Doctor {
    /// Create a new doctor instance; the store is built from `config`
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: None,
        }
    }

    /// Check an already built store instead
    pub fn with_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Run all health checks
    pub async fn run_diagnostics(&self) -> Vec<HealthCheck> {
        let mut checks = vec![self.check_config(), self.check_state_dir()];

        let store = match &self.store {
            Some(store) => Ok(store.clone()),
            None => build_store(&self.config).await,
        };

        match store {
            Ok(store) => {
                let ready = self.check_store(store.as_ref()).await;
                let reachable = ready.status == HealthStatus::Pass;
                checks.push(ready);
                if reachable {
                    checks.extend(self.check_collections(store.as_ref()).await);
                }
            }
            Err(e) => checks.push(HealthCheck::new(
                "Vector Store",
                HealthStatus::Fail(format!("Cannot create client: {}", e)),
            )),
        }

        checks.push(self.check_provider_key());
        checks.push(self.check_embedding_key());
        checks
    }

    fn check_config(&self) -> HealthCheck {
        match self.config.validate() {
            Ok(()) => HealthCheck::new("Configuration", HealthStatus::Pass),
            Err(e) => HealthCheck::new("Configuration", HealthStatus::Fail(e.to_string())),
        }
    }

    /// State directory exists or can be created
    fn check_state_dir(&self) -> HealthCheck {
        let dir = self.config.state_dir();
        match std::fs::create_dir_all(&dir) {
            Ok(()) => HealthCheck::new("State Directory", HealthStatus::Pass),
            Err(e) => HealthCheck::new(
                "State Directory",
                HealthStatus::Warn(format!("{} is not writable: {}", dir.display(), e)),
            ),
        }
    }

    async fn check_store(&self, store: &dyn VectorStore) -> HealthCheck {
        let name = format!("Vector Store ({})", store.backend_name());
        match store.is_ready().await {
            Ok(true) => HealthCheck::new(name, HealthStatus::Pass),
            Ok(false) => HealthCheck::new(
                name,
                HealthStatus::Fail("Not ready or not reachable".to_string()),
            ),
            Err(e) => HealthCheck::new(name, HealthStatus::Fail(format!("Error checking store: {}", e))),
        }
    }

    /// Empty collections warn; missing ones fail
    async fn check_collections(&self, store: &dyn VectorStore) -> Vec<HealthCheck> {
        let mut checks = Vec::new();
        for kind in CollectionKind::all() {
            let schema = self.config.store.collections.schema(kind);
            let status = match store.count(&schema).await {
                Ok(0) => HealthStatus::Warn("Collection is empty; run `mtgjudge ingest`".to_string()),
                Ok(_) => HealthStatus::Pass,
                Err(e) => HealthStatus::Fail(format!("Cannot count objects: {}", e)),
            };
            checks.push(HealthCheck::new(format!("Collection {}", schema.name), status));
        }
        checks
    }

    fn check_provider_key(&self) -> HealthCheck {
        let provider = self.config.llm.provider;
        let name = format!("LLM Key ({})", provider);
        if has_api_key(&self.config.llm, provider) {
            HealthCheck::new(name, HealthStatus::Pass)
        } else {
            let var = match provider {
                crate::config::ProviderKind::OpenAi => "OPENAI_API_KEY",
                crate::config::ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            };
            HealthCheck::new(name, HealthStatus::Fail(format!("{} is not set", var)))
        }
    }

    /// Only the qdrant backend embeds client-side
    fn check_embedding_key(&self) -> HealthCheck {
        let needs_key = self.config.store.backend == Backend::Qdrant;
        let has_key = self
            .config
            .llm
            .openai_api_key
            .as_deref()
            .map(|k| !k.is_empty())
            .unwrap_or(false);

        let status = if !needs_key || has_key {
            HealthStatus::Pass
        } else {
            HealthStatus::Fail("OPENAI_API_KEY is required for qdrant embeddings".to_string())
        };
        HealthCheck::new("Embedding Key", status)
    }

    /// Display diagnostics results
    pub fn display_results(checks: &[HealthCheck]) {
        println!("\n{}\n", "mtgjudge System Diagnostics".bold());
        println!("{:<32} Status", "Check");
        println!("{}", "=".repeat(60));

        for check in checks {
            let status = match &check.status {
                HealthStatus::Pass => "PASS".green().to_string(),
                HealthStatus::Warn(msg) => format!("{} {}", "WARN:".yellow(), msg),
                HealthStatus::Fail(msg) => format!("{} {}", "FAIL:".red(), msg),
            };
            println!("{:<32} {}", check.name, status);
        }

        println!();
    }

    /// Get overall health status
    pub fn overall_status(checks: &[HealthCheck]) -> bool {
        !checks.iter().any(|c| matches!(c.status, HealthStatus::Fail(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::store::{Document, MemoryStore};

    fn memory_config(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.store.backend = Backend::Memory;
        config.paths.state_dir = dir.display().to_string();
        config.llm.openai_api_key = Some("sk-test".to_string());
        config
    }

    #[test]
    fn test_overall_status() {
        let checks = vec![
            HealthCheck::new("Test 1", HealthStatus::Pass),
            HealthCheck::new("Test 2", HealthStatus::Warn("warning".to_string())),
        ];
        assert!(Doctor::overall_status(&checks));

        let checks = vec![HealthCheck::new("Test", HealthStatus::Fail("error".to_string()))];
        assert!(!Doctor::overall_status(&checks));
    }

    #[tokio::test]
    async fn test_missing_collections_fail_and_empty_warn() {
        let dir = tempfile::tempdir().unwrap();
        let config = memory_config(dir.path());
        let store = Arc::new(MemoryStore::new(Arc::new(HashEmbedder::new(32))));

        let rules = config.store.collections.schema(CollectionKind::Rules);
        let cards = config.store.collections.schema(CollectionKind::Cards);
        store.ensure_collection(&rules).await.unwrap();
        store.ensure_collection(&cards).await.unwrap();
        store
            .insert_batch(
                &rules,
                vec![Document::new(crate::corpus::RuleEntry::parse("100.1 Magic").to_properties())],
            )
            .await
            .unwrap();

        let checks = Doctor::new(config).with_store(store).run_diagnostics().await;
        let status_of = |name: &str| {
            checks
                .iter()
                .find(|c| c.name == name)
                .map(|c| c.status.clone())
                .unwrap()
        };

        assert_eq!(status_of("Configuration"), HealthStatus::Pass);
        assert_eq!(status_of("Vector Store (memory)"), HealthStatus::Pass);
        assert_eq!(status_of("Collection MTGOfficialRules"), HealthStatus::Pass);
        assert!(matches!(status_of("Collection MTGCards"), HealthStatus::Warn(_)));
        assert!(matches!(status_of("Collection MTGRulings"), HealthStatus::Fail(_)));
        assert_eq!(status_of("LLM Key (openai)"), HealthStatus::Pass);
        assert_eq!(status_of("Embedding Key"), HealthStatus::Pass);
    }

    #[tokio::test]
    async fn test_memory_backend_keeps_collections_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let config = memory_config(dir.path());

        let store = build_store(&config).await.unwrap();
        for kind in CollectionKind::all() {
            store
                .ensure_collection(&config.store.collections.schema(kind))
                .await
                .unwrap();
        }
        let rules = config.store.collections.schema(CollectionKind::Rules);
        store
            .insert_batch(
                &rules,
                vec![Document::new(crate::corpus::RuleEntry::parse("100.1 Magic").to_properties())],
            )
            .await
            .unwrap();
        drop(store);

        let checks = Doctor::new(config).run_diagnostics().await;
        let collections: Vec<&HealthCheck> = checks
            .iter()
            .filter(|c| c.name.starts_with("Collection "))
            .collect();

        assert_eq!(collections.len(), 3);
        assert!(collections
            .iter()
            .all(|c| !matches!(c.status, HealthStatus::Fail(_))));
        assert_eq!(collections[0].status, HealthStatus::Pass);
        assert!(Doctor::overall_status(&checks));
    }

    #[test]
    fn test_qdrant_requires_embedding_key() {
        let mut config = Config::default();
        config.store.backend = Backend::Qdrant;
        config.llm.openai_api_key = None;
        let doctor = Doctor::new(config);
        assert!(matches!(
            doctor.check_embedding_key().status,
            HealthStatus::Fail(_)
        ));
        assert!(matches!(
            doctor.check_provider_key().status,
            HealthStatus::Fail(_)
        ));
    }

    #[test]
    fn test_health_check_serializes() {
        let check = HealthCheck::new("Collection MTGCards", HealthStatus::Warn("empty".to_string()));
        let value = serde_json::to_value(&check).unwrap();
        assert_eq!(value["status"]["status"], "warn");
        assert_eq!(value["status"]["message"], "empty");
    }
}
