//! Configuration management for mtgjudge
//!
//! TOML-based configuration with defaults, environment overrides and
//! validation. Location: ~/.mtgjudge/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::collections::CollectionNames;
use crate::errors::{JudgeError, Result};

/// Complete configuration for mtgjudge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub weaviate: WeaviateConfig,
    pub qdrant: QdrantConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub ingest: IngestConfig,
    pub paths: PathsConfig,
}

/// Which vector database holds the collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Weaviate,
    Qdrant,
    Memory,
}

/// Which language model answers the question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[value(name = "openai")]
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Anthropic => write!(f, "anthropic"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: Backend,
    pub collections: CollectionNames,
}

/// Hosted Weaviate cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaviateConfig {
    /// Cluster URL, scheme optional
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Model handed to the text2vec-weaviate vectorizer
    pub vectorizer_model: String,
    /// Forward provider keys so Weaviate's generative modules can use them
    pub forward_provider_keys: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
}

/// Client-side embeddings (qdrant backend)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    pub openai_model: String,
    pub anthropic_model: String,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub openai_base_url: String,
    pub anthropic_base_url: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub rules_limit: usize,
    pub cards_limit: usize,
    pub rulings_limit: usize,
    pub min_score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub batch_size: usize,
    pub max_errors: usize,
    /// Rule blocks longer than this are split before upload
    pub max_chunk_chars: usize,
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub state_dir: String,
    pub log_dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Weaviate,
            collections: CollectionNames::default(),
        }
    }
}

impl Default for WeaviateConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            api_key: None,
            timeout_secs: 60,
            vectorizer_model: "Snowflake/snowflake-arctic-embed-l-v2.0".to_string(),
            forward_provider_keys: true,
        }
    }
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key: None,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            openai_model: "gpt-4".to_string(),
            anthropic_model: "claude-3-5-sonnet-latest".to_string(),
            openai_api_key: None,
            anthropic_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            anthropic_base_url: "https://api.anthropic.com/v1".to_string(),
            temperature: 0.1,
            max_tokens: 1000,
            timeout_secs: 120,
            max_retries: 3,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            rules_limit: 3,
            cards_limit: 3,
            rulings_limit: 3,
            min_score: 0.7,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            max_errors: 10,
            max_chunk_chars: 2000,
            chunk_overlap: 200,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_dir: "~/.mtgjudge".to_string(),
            log_dir: "~/.mtgjudge/logs".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults, then apply environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(config_path) => Self::load_from_file(config_path)?,
            None => Self::load_default()?,
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| JudgeError::ConfigError(format!("Failed to read config: {}", e)))?;

        toml::from_str(&contents)
            .map_err(|e| JudgeError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Load from the standard location or fall back to built-in defaults
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(config_path) if config_path.exists() => Self::load_from_file(&config_path),
            _ => Ok(Config::default()),
        }
    }

    /// Standard config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".mtgjudge").join("config.toml"))
    }

    /// Override endpoints and secrets from the environment.
    ///
    /// Takes a lookup function so tests don't have to touch process state.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("WEAVIATE_URL") {
            self.weaviate.url = url;
        }
        if let Some(key) = non_empty("WEAVIATE_API") {
            self.weaviate.api_key = Some(key);
        }
        if let Some(url) = non_empty("QDRANT_URL") {
            self.qdrant.url = url;
        }
        if let Some(key) = non_empty("QDRANT_API_KEY") {
            self.qdrant.api_key = Some(key);
        }
        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.llm.openai_api_key = Some(key);
        }
        if let Some(key) = non_empty("ANTHROPIC_API_KEY") {
            self.llm.anthropic_api_key = Some(key);
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let r = &self.retrieval;
        if r.rules_limit == 0 && r.cards_limit == 0 && r.rulings_limit == 0 {
            return Err(JudgeError::ConfigError(
                "at least one retrieval limit must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&r.min_score) {
            return Err(JudgeError::ConfigError(
                "min_score must be between 0.0 and 1.0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(JudgeError::ConfigError(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.llm.max_tokens == 0 {
            return Err(JudgeError::ConfigError(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        if self.ingest.batch_size == 0 {
            return Err(JudgeError::ConfigError(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        if self.ingest.chunk_overlap >= self.ingest.max_chunk_chars {
            return Err(JudgeError::ConfigError(
                "chunk_overlap must be less than max_chunk_chars".to_string(),
            ));
        }

        if self.embedding.dimension == 0 {
            return Err(JudgeError::ConfigError(
                "embedding dimension must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| JudgeError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                JudgeError::ConfigError(format!("Failed to create config dir: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| JudgeError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Copy with every secret replaced, for display
    pub fn redacted(&self) -> Self {
        let mask = |key: &Option<String>| key.as_ref().map(|_| "********".to_string());
        let mut copy = self.clone();
        copy.weaviate.api_key = mask(&self.weaviate.api_key);
        copy.qdrant.api_key = mask(&self.qdrant.api_key);
        copy.llm.openai_api_key = mask(&self.llm.openai_api_key);
        copy.llm.anthropic_api_key = mask(&self.llm.anthropic_api_key);
        copy
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    pub fn state_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.state_dir)
    }

    pub fn log_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.log_dir)
    }
}
