// Retrieval-augmented answering of rules questions
//
// Components:
// - Retrieval: concurrent near-text search over rules, cards and rulings
// - Context: the text block the model reads
// - Prompt: judge system prompt and question template
// - Pipeline: retrieve, format, generate

pub mod context;
pub mod pipeline;
pub mod prompt;
pub mod retrieval;

pub use context::format_context;
pub use pipeline::{AskOptions, Answer, BatchEntry, DebugInfo, JudgePipeline, SourceCounts};
pub use retrieval::{Retriever, SearchLimits, SearchMetadata, SearchResults};
