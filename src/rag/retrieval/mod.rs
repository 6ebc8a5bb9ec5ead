// Retrieval over the three judge collections
pub mod engine;

pub use engine::{Retriever, SearchLimits, SearchMetadata, SearchResults};
