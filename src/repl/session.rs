//! Session state for the REPL
//!
//! Tracks the retrieval options in effect, debug mode, and the answers
//! given so far.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::ProviderKind;
use crate::rag::{Answer, AskOptions, SourceCounts};
use crate::repl::commands::Command;

/// Maximum number of answers to keep in history
const MAX_HISTORY_SIZE: usize = 100;

/// Record of one answered question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question: String,
    pub sources: SourceCounts,
    pub failed: bool,
}

/// What the loop should do after a command
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Exit,
    Help,
    Clear,
    ShowSources,
    SwitchProvider(ProviderKind),
    Message(String),
    Error(String),
}

pub struct SessionManager {
    options: AskOptions,
    history: VecDeque<QuestionRecord>,
}

impl SessionManager {
    pub fn new(options: AskOptions) -> Self {
        SessionManager {
            options,
            history: VecDeque::new(),
        }
    }

    pub fn options(&self) -> &AskOptions {
        &self.options
    }

    pub fn debug(&self) -> bool {
        self.options.include_debug
    }

    pub fn record_answer(&mut self, answer: &Answer) {
        if self.history.len() >= MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back(QuestionRecord {
            question: answer.question.clone(),
            sources: answer.sources_found,
            failed: answer.generation_failed,
        });
    }

    pub fn last_sources(&self) -> Option<&SourceCounts> {
        self.history.back().map(|r| &r.sources)
    }

    pub fn question_count(&self) -> usize {
        self.history.len()
    }

    /// Apply a command to the session state
    pub fn apply(&mut self, command: Command) -> Action {
        match command {
            Command::Help => Action::Help,
            Command::Exit => Action::Exit,
            Command::Clear => Action::Clear,
            Command::Sources => Action::ShowSources,
            Command::Debug { enable } => {
                let enable = enable.unwrap_or(!self.options.include_debug);
                self.options.include_debug = enable;
                Action::Message(format!(
                    "Debug output {}",
                    if enable { "enabled" } else { "disabled" }
                ))
            }
            Command::Limits(limits) => {
                self.options.limits = limits;
                Action::Message(format!(
                    "Limits set: {} rules, {} cards, {} rulings",
                    limits.rules, limits.cards, limits.rulings
                ))
            }
            Command::MinScore(score) => {
                self.options.min_score = score;
                Action::Message(format!("Minimum score set to {:.2}", score))
            }
            Command::Provider(kind) => Action::SwitchProvider(kind),
            Command::Invalid { usage } => Action::Error(format!("Usage: {}", usage)),
            Command::Unknown { input } => {
                Action::Error(format!("Unknown command: {} (try /help)", input))
            }
        }
    }
}
