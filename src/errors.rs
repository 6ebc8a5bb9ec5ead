//! Error types for mtgjudge
//!
//! One error enum for the library; the binary wraps it in `anyhow` with
//! context at the command boundary.

use thiserror::Error;

/// Main error type for retrieval, ingestion and generation
#[derive(Error, Debug)]
pub enum JudgeError {
    /// Configuration errors (missing keys, invalid values)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Vector database errors
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError { backend: String, message: String },

    /// Language model provider errors
    #[error("{provider} API error: {message}")]
    ProviderError { provider: String, message: String },

    /// Malformed rulebook or card data
    #[error("Corpus error: {0}")]
    CorpusError(String),

    /// Batch import gave up
    #[error("Import into {collection} aborted: {errors} errors exceeds limit of {limit}")]
    IngestAborted {
        collection: String,
        errors: usize,
        limit: usize,
    },

    /// Operation not offered by a backend
    #[error("{backend} does not support {operation}")]
    Unsupported { backend: String, operation: String },

    /// Timeout errors
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Generic errors with context
    #[error("{0}")]
    Generic(String),
}

impl JudgeError {
    pub fn store(backend: &str, message: impl Into<String>) -> Self {
        JudgeError::VectorStoreError {
            backend: backend.to_string(),
            message: message.into(),
        }
    }

    pub fn provider(provider: &str, message: impl Into<String>) -> Self {
        JudgeError::ProviderError {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            JudgeError::HttpError(_) => true,
            JudgeError::Timeout { .. } => true,
            JudgeError::VectorStoreError { .. } => true,
            JudgeError::ProviderError { .. } => true,
            JudgeError::ConfigError(_)
            | JudgeError::SerializationError(_)
            | JudgeError::IoError(_)
            | JudgeError::CorpusError(_)
            | JudgeError::IngestAborted { .. }
            | JudgeError::Unsupported { .. }
            | JudgeError::Generic(_) => false,
        }
    }
}

/// Result type alias for library operations
pub type Result<T> = std::result::Result<T, JudgeError>;

impl From<anyhow::Error> for JudgeError {
    fn from(err: anyhow::Error) -> Self {
        JudgeError::Generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = JudgeError::IngestAborted {
            collection: "MTGCards".to_string(),
            errors: 11,
            limit: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("MTGCards"));
        assert!(msg.contains("11"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn test_provider_error_names_provider() {
        let err = JudgeError::provider("openai", "HTTP 429: rate limited");
        assert_eq!(err.to_string(), "openai API error: HTTP 429: rate limited");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(JudgeError::Timeout { duration_ms: 10 }.is_retryable());
        assert!(JudgeError::store("weaviate", "503").is_retryable());
        assert!(!JudgeError::ConfigError("missing key".into()).is_retryable());
        assert!(!JudgeError::CorpusError("bad json".into()).is_retryable());
    }
}
