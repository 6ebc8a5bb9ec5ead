//! mtgjudge - Magic: The Gathering rules judge
//!
//! Retrieval-augmented answers to rules questions. The Comprehensive Rules,
//! Oracle card text and official rulings are imported into a vector
//! database; each question pulls the closest entries from all three
//! collections and a language model answers from that context.
//!
//! # Architecture
//!
//! - **Corpus**: rulebook splitting, MTGJSON card parsing, chunking
//! - **Store**: Weaviate, Qdrant and in-memory backends behind one trait
//! - **Ingest**: batched import with error accounting
//! - **RAG**: multi-collection search, context formatting, answer generation
//! - **Interface**: CLI, REPL and diagnostics

pub mod collections;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod errors;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod rag;
pub mod store;

// Re-export commonly used types
pub use errors::{JudgeError, Result};

pub mod cli;
pub mod doctor;
pub mod repl;
