//! Integration tests for mtgjudge
//!
//! Runs import, retrieval and answering end to end against the in-memory
//! store with a scripted language model. No network required.

use async_trait::async_trait;
use std::io::Write;
use std::sync::{Arc, Mutex};

use mtgjudge::collections::{CollectionKind, CollectionNames};
use mtgjudge::config::IngestConfig;
use mtgjudge::corpus::{load_rulebook, AtomicCards};
use mtgjudge::embedding::HashEmbedder;
use mtgjudge::ingest::Ingestor;
use mtgjudge::llm::{GenerationConfig, LlmProvider, LlmResponse, Message};
use mtgjudge::rag::{AskOptions, BatchEntry, JudgePipeline, SearchLimits};
use mtgjudge::store::{MemoryStore, VectorStore};
use mtgjudge::{JudgeError, Result};

const RULEBOOK: &str = "Magic: The Gathering Comprehensive Rules\n\n\
7. Additional Rules\n\n\
702.19b The controller of an attacking creature with trample first assigns damage to the creature(s) blocking it.\n\n\
702.2b A creature with deathtouch that deals damage to a creature destroys it.\n";

const CARDS: &str = r#"{
    "data": {
        "Colossal Dreadmaw": [{
            "name": "Colossal Dreadmaw",
            "manaCost": "{4}{G}{G}",
            "type": "Creature — Dinosaur",
            "text": "Trample",
            "power": "6",
            "toughness": "6",
            "colors": ["G"],
            "rulings": [
                {"date": "2018-01-19", "text": "Trample damage beyond lethal goes to the player."}
            ]
        }],
        "Typhoid Rats": [{
            "name": "Typhoid Rats",
            "manaCost": "{B}",
            "type": "Creature — Rat",
            "text": "Deathtouch",
            "power": "1",
            "toughness": "1",
            "colors": ["B"]
        }]
    }
}"#;

/// Answers with a fixed text and remembers every prompt it was given
struct ScriptedJudge {
    prompts: Mutex<Vec<String>>,
}

impl ScriptedJudge {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LlmProvider for ScriptedJudge {
    async fn generate_chat(
        &self,
        messages: &[Message],
        _config: &GenerationConfig,
    ) -> Result<LlmResponse> {
        let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt);
        Ok(LlmResponse {
            content: "Assign lethal damage to the blocker; the rest may go to the player.".to_string(),
            model: "scripted".to_string(),
            prompt_tokens: None,
            completion_tokens: None,
            finish_reason: Some("stop".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

struct Unreachable;

#[async_trait]
impl LlmProvider for Unreachable {
    async fn generate_chat(
        &self,
        _messages: &[Message],
        _config: &GenerationConfig,
    ) -> Result<LlmResponse> {
        Err(JudgeError::provider("unreachable", "connection refused"))
    }

    fn provider_name(&self) -> &str {
        "unreachable"
    }

    fn model_name(&self) -> &str {
        "none"
    }
}

fn open_options() -> AskOptions {
    AskOptions {
        min_score: 0.0,
        include_debug: true,
        ..Default::default()
    }
}

async fn ingested_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new(Arc::new(HashEmbedder::new(256))));
    let names = CollectionNames::default();
    let ingestor = Ingestor::new(store.clone(), IngestConfig::default());
    ingestor.create_schemas(&names).await.unwrap();

    let mut rulebook = tempfile::NamedTempFile::new().unwrap();
    rulebook.write_all(RULEBOOK.as_bytes()).unwrap();
    let entries = load_rulebook(rulebook.path()).unwrap();
    let cards = AtomicCards::parse(CARDS).unwrap();

    let rules = ingestor
        .ingest_rules(&names.schema(CollectionKind::Rules), &entries)
        .await
        .unwrap();
    let card_report = ingestor
        .ingest_cards(&names.schema(CollectionKind::Cards), &cards)
        .await
        .unwrap();
    let rulings = ingestor
        .ingest_rulings(&names.schema(CollectionKind::Rulings), &cards)
        .await
        .unwrap();

    assert_eq!(rules.inserted, 4);
    assert_eq!(card_report.inserted, 2);
    assert_eq!(rulings.inserted, 1);
    store
}

#[tokio::test]
async fn test_ingest_then_ask() {
    let store = ingested_store().await;
    let judge = ScriptedJudge::new();
    let pipeline = JudgePipeline::new(store, &CollectionNames::default(), judge.clone());

    let answer = pipeline
        .answer_question("How does trample damage work?", &open_options())
        .await
        .unwrap();

    assert!(!answer.generation_failed);
    assert!(answer.answer.starts_with("Assign lethal damage"));
    assert_eq!(answer.sources_found.rules, 3);
    assert_eq!(answer.sources_found.cards, 2);
    assert_eq!(answer.sources_found.rulings, 1);

    let prompts = judge.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("QUESTION: How does trample damage work?"));
    assert!(prompts[0].contains("702.19b"));
    assert!(prompts[0].contains("Colossal Dreadmaw 4GG - Creature — Dinosaur (6/6)"));
}

#[tokio::test]
async fn test_debug_context_sections() {
    let store = ingested_store().await;
    let pipeline = JudgePipeline::new(store, &CollectionNames::default(), ScriptedJudge::new());

    let answer = pipeline
        .answer_question("deathtouch", &open_options())
        .await
        .unwrap();
    let debug = answer.debug.expect("debug info requested");

    let context = &debug.formatted_context;
    assert!(context.starts_with("SEARCH QUERY: deathtouch\n"));
    assert!(context.contains("=== OFFICIAL RULES ==="));
    assert!(context.contains("=== RELEVANT CARDS ==="));
    assert!(context.contains("=== OFFICIAL RULINGS ==="));
    assert!(context.contains("Ruling: Trample damage beyond lethal goes to the player."));
}

#[tokio::test]
async fn test_zero_limits_skip_collections() {
    let store = ingested_store().await;
    let pipeline = JudgePipeline::new(store, &CollectionNames::default(), ScriptedJudge::new());

    let options = AskOptions {
        limits: SearchLimits {
            rules: 1,
            cards: 0,
            rulings: 0,
        },
        ..open_options()
    };
    let answer = pipeline.answer_question("trample", &options).await.unwrap();

    assert_eq!(answer.sources_found.rules, 1);
    assert_eq!(answer.sources_found.cards, 0);
    assert_eq!(answer.sources_found.rulings, 0);
    let context = answer.debug.unwrap().formatted_context;
    assert!(!context.contains("=== RELEVANT CARDS ==="));
}

#[tokio::test]
async fn test_provider_failure_still_answers() {
    let store = ingested_store().await;
    let pipeline = JudgePipeline::new(store, &CollectionNames::default(), Arc::new(Unreachable));

    let answer = pipeline
        .answer_question("What does trample do?", &open_options())
        .await
        .unwrap();

    assert!(answer.generation_failed);
    assert!(answer
        .answer
        .starts_with("I encountered an error while generating the answer:"));
    assert!(answer.answer.contains("connection refused"));
}

#[tokio::test]
async fn test_batch_keeps_order_and_marks_errors() {
    let store = ingested_store().await;
    let pipeline = JudgePipeline::new(store, &CollectionNames::default(), ScriptedJudge::new());

    let questions = vec![
        "What is trample?".to_string(),
        "   ".to_string(),
        "What is deathtouch?".to_string(),
    ];
    let entries = pipeline
        .batch_answer_questions(&questions, &open_options())
        .await;

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].question(), "What is trample?");
    assert!(!entries[0].is_error());
    assert!(entries[1].is_error());
    assert!(entries[1].answer().starts_with("Error processing question:"));
    assert_eq!(entries[2].question(), "What is deathtouch?");

    let json = serde_json::to_value(&entries).unwrap();
    assert_eq!(json[1]["error"], serde_json::Value::Bool(true));
    assert!(json[0].get("error").is_none());
    assert!(matches!(entries[2], BatchEntry::Answered(_)));
}

#[tokio::test]
async fn test_missing_collections_yield_empty_context() {
    let store = Arc::new(MemoryStore::new(Arc::new(HashEmbedder::new(64))));
    let pipeline = JudgePipeline::new(store.clone(), &CollectionNames::default(), ScriptedJudge::new());

    let answer = pipeline
        .answer_question("Is anything there?", &open_options())
        .await
        .unwrap();

    assert_eq!(answer.sources_found.rules, 0);
    assert_eq!(answer.sources_found.cards, 0);
    assert_eq!(answer.sources_found.rulings, 0);
    assert!(!answer.generation_failed);
    assert_eq!(store.backend_name(), "memory");
}
