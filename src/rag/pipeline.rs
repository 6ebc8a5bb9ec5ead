// End-to-end judge pipeline: retrieve, format, generate
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::collections::{CollectionKind, CollectionNames};
use crate::config::Config;
use crate::errors::{JudgeError, Result};
use crate::llm::{GenerationConfig, LlmProvider, Message};
use crate::rag::context::format_context;
use crate::rag::prompt::{user_prompt, DEFAULT_SUMMARY_TASK, SYSTEM_PROMPT};
use crate::rag::retrieval::{Retriever, SearchLimits, SearchResults};
use crate::store::VectorStore;

/// Per-question options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AskOptions {
    pub limits: SearchLimits,
    pub min_score: f32,
    pub temperature: f32,
    pub max_tokens: usize,
    pub include_debug: bool,
}

impl Default for AskOptions {
    fn default() -> Self {
        Self {
            limits: SearchLimits::default(),
            min_score: 0.7,
            temperature: 0.1,
            max_tokens: 1000,
            include_debug: false,
        }
    }
}

impl AskOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            limits: SearchLimits::from_config(&config.retrieval),
            min_score: config.retrieval.min_score,
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            include_debug: false,
        }
    }

    /// Same bounds as the `[retrieval]` and `[llm]` config sections
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(JudgeError::ConfigError(format!(
                "min_score must be between 0.0 and 1.0, got {}",
                self.min_score
            )));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(JudgeError::ConfigError(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(JudgeError::ConfigError(
                "max_tokens must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Hits kept per collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounts {
    pub rules: usize,
    pub cards: usize,
    pub rulings: usize,
}

impl From<&SearchResults> for SourceCounts {
    fn from(results: &SearchResults) -> Self {
        Self {
            rules: results.rules.len(),
            cards: results.cards.len(),
            rulings: results.rulings.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    pub limits: SearchLimits,
    pub min_score: f32,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugInfo {
    pub search_results: SearchResults,
    pub formatted_context: String,
    pub search_params: SearchParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Local>,
    pub sources_found: SourceCounts,
    /// The answer text is an error message, not a model answer
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub generation_failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugInfo>,
}

/// One result of a batch run, in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Answered(Answer),
    Failed {
        question: String,
        answer: String,
        error: bool,
    },
}

impl BatchEntry {
    pub fn question(&self) -> &str {
        match self {
            BatchEntry::Answered(a) => &a.question,
            BatchEntry::Failed { question, .. } => question,
        }
    }

    pub fn answer(&self) -> &str {
        match self {
            BatchEntry::Answered(a) => &a.answer,
            BatchEntry::Failed { answer, .. } => answer,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, BatchEntry::Failed { .. })
    }
}

pub struct JudgePipeline {
    retriever: Retriever,
    provider: Arc<dyn LlmProvider>,
    /// Sampling for requests not driven by `AskOptions`
    generation: GenerationConfig,
}

impl JudgePipeline {
    pub fn new(
        store: Arc<dyn VectorStore>,
        names: &CollectionNames,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            retriever: Retriever::new(store, names),
            provider,
            generation: GenerationConfig::default(),
        }
    }

    /// Sampling used by `summarize`
    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn generation(&self) -> &GenerationConfig {
        &self.generation
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Swap the language model; retrieval is unchanged
    pub fn set_provider(&mut self, provider: Arc<dyn LlmProvider>) {
        self.provider = provider;
    }

    pub async fn search(&self, query: &str, options: &AskOptions) -> SearchResults {
        self.retriever
            .search_all(query, options.limits, options.min_score)
            .await
    }

    /// Provider failures become the answer text, never an error
    async fn generate_answer(
        &self,
        question: &str,
        context: &str,
        options: &AskOptions,
    ) -> (String, bool) {
        let messages = [
            Message::system(SYSTEM_PROMPT),
            Message::user(user_prompt(question, context)),
        ];
        let generation = GenerationConfig {
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        match self.provider.generate_chat(&messages, &generation).await {
            Ok(response) => (response.content, false),
            Err(e) => {
                error!("Error generating answer: {}", e);
                (
                    format!("I encountered an error while generating the answer: {}", e),
                    true,
                )
            }
        }
    }

    pub async fn answer_question(&self, question: &str, options: &AskOptions) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(JudgeError::ConfigError("question must not be empty".to_string()));
        }
        info!("Processing question: '{}'", question);

        let results = self.search(question, options).await;
        let context = format_context(&results);
        let (answer, generation_failed) = self.generate_answer(question, &context, options).await;
        let sources_found = SourceCounts::from(&results);

        let debug = options.include_debug.then(|| DebugInfo {
            search_params: SearchParams {
                limits: options.limits,
                min_score: options.min_score,
                temperature: options.temperature,
            },
            formatted_context: context,
            search_results: results,
        });

        info!(
            rules = sources_found.rules,
            cards = sources_found.cards,
            rulings = sources_found.rulings,
            "answer generated"
        );

        Ok(Answer {
            question: question.to_string(),
            answer,
            timestamp: Local::now(),
            sources_found,
            generation_failed,
            debug,
        })
    }

    /// Questions are answered one after another, results in input order
    pub async fn batch_answer_questions(
        &self,
        questions: &[String],
        options: &AskOptions,
    ) -> Vec<BatchEntry> {
        let mut entries = Vec::with_capacity(questions.len());

        for (i, question) in questions.iter().enumerate() {
            info!("Processing question {}/{}", i + 1, questions.len());
            match self.answer_question(question, options).await {
                Ok(answer) => entries.push(BatchEntry::Answered(answer)),
                Err(e) => {
                    error!("Error processing question {}: {}", i + 1, e);
                    entries.push(BatchEntry::Failed {
                        question: question.clone(),
                        answer: format!("Error processing question: {}", e),
                        error: true,
                    });
                }
            }
        }
        entries
    }

    /// One generative task over the top `limit` hits of a collection.
    /// Backends without server-side generation fall back to the provider.
    pub async fn summarize(
        &self,
        kind: CollectionKind,
        query: &str,
        limit: usize,
        task: Option<&str>,
    ) -> Result<String> {
        let task = task.unwrap_or(DEFAULT_SUMMARY_TASK);
        let schema = self.retriever.schema(kind);
        let store = self.retriever.store();

        match store.generate_grouped(schema, query, limit, task).await {
            Err(JudgeError::Unsupported { backend, .. }) => {
                warn!("{} has no grouped generation, using {}", backend, self.provider.provider_name());
            }
            other => return other,
        }

        let hits = store.near_text(schema, query, limit).await?;
        if hits.is_empty() {
            return Ok(String::new());
        }

        let items: Vec<String> = hits
            .iter()
            .enumerate()
            .map(|(i, hit)| {
                let text = schema
                    .source_properties
                    .iter()
                    .map(|p| hit.text(p))
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("{}. {}", i + 1, text)
            })
            .collect();

        let messages = [
            Message::system(SYSTEM_PROMPT),
            Message::user(format!("{}\n\nQUERY: {}\n\n{}", task, query, items.join("\n"))),
        ];
        let response = self
            .provider
            .generate_chat(&messages, &self.generation)
            .await?;
        Ok(response.content)
    }
}
