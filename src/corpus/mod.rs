//! Source corpora: the comprehensive rulebook and MTGJSON card data
//!
//! - Rules: plain-text rulebook split into blank-line separated entries
//! - Cards: `AtomicCards.json`, yielding card records and ruling records
//! - Chunker: recursive character splitter for oversized entries

pub mod cards;
pub mod chunker;
pub mod rules;

pub use cards::{AtomicCard, AtomicCards, CardRecord, RulingRecord};
pub use chunker::RecursiveSplitter;
pub use rules::{load_rulebook, split_rulebook, RuleEntry};
