//! REPL (Read-Eval-Print Loop) for interactive rules questions
//!
//! Slash commands adjust retrieval settings; every other line is sent
//! through the judge pipeline.

pub mod commands;
pub mod display;
pub mod input;
pub mod session;

use anyhow::Result;
use std::path::PathBuf;
use tracing::warn;

use crate::config::LlmConfig;
use crate::llm::build_provider;
use crate::rag::{AskOptions, JudgePipeline};
use crate::repl::commands::{is_command, parse};
pub use crate::repl::display::DisplayManager;
use crate::repl::input::{InputEvent, InputHandler};
pub use crate::repl::session::{Action, SessionManager};

/// REPL session coordinator
pub struct ReplSession {
    input_handler: InputHandler,
    session_manager: SessionManager,
    display_manager: DisplayManager,
}

impl ReplSession {
    pub fn new(options: AskOptions) -> Result<Self> {
        Ok(ReplSession {
            input_handler: InputHandler::new()?,
            session_manager: SessionManager::new(options),
            display_manager: DisplayManager::new(),
        })
    }

    /// Create REPL session with persistent history
    pub fn with_history(options: AskOptions, history_path: PathBuf) -> Result<Self> {
        Ok(ReplSession {
            input_handler: InputHandler::with_history(history_path)?,
            session_manager: SessionManager::new(options),
            display_manager: DisplayManager::new(),
        })
    }

    pub fn session(&self) -> &SessionManager {
        &self.session_manager
    }

    pub fn display(&self) -> &DisplayManager {
        &self.display_manager
    }

    /// Read, dispatch and answer until `/exit` or Ctrl-D
    pub async fn run(&mut self, pipeline: &mut JudgePipeline, llm: &LlmConfig) -> Result<()> {
        self.display_manager.show_banner(
            env!("CARGO_PKG_VERSION"),
            pipeline.retriever().store().backend_name(),
            pipeline.provider().model_name(),
        );

        loop {
            let line = match self.input_handler.read_line()? {
                InputEvent::Line(line) => line,
                InputEvent::Interrupted => continue,
                InputEvent::Eof => break,
            };
            if line.is_empty() {
                continue;
            }

            if is_command(&line) {
                let action = self.session_manager.apply(parse(&line));
                if !self.perform(action, pipeline, llm)? {
                    break;
                }
                continue;
            }

            self.ask(pipeline, &line).await;
        }

        if let Err(e) = self.input_handler.save_history() {
            warn!("Failed to save history: {}", e);
        }
        println!("Goodbye!");
        Ok(())
    }

    async fn ask(&mut self, pipeline: &JudgePipeline, question: &str) {
        let options = *self.session_manager.options();
        self.display_manager.start_spinner("Consulting the rules...");

        match pipeline.answer_question(question, &options).await {
            Ok(answer) => {
                self.display_manager.show_answer(&answer, options.include_debug);
                self.session_manager.record_answer(&answer);
            }
            Err(e) => {
                self.display_manager.finish_current();
                self.display_manager.show_error(&e.to_string());
            }
        }
    }

    /// Returns false when the loop should end
    fn perform(
        &mut self,
        action: Action,
        pipeline: &mut JudgePipeline,
        llm: &LlmConfig,
    ) -> Result<bool> {
        match action {
            Action::Exit => return Ok(false),
            Action::Help => self.display_manager.show_help(),
            Action::Clear => self.display_manager.clear_screen()?,
            Action::ShowSources => self
                .display_manager
                .show_sources(self.session_manager.last_sources()),
            Action::SwitchProvider(kind) => match build_provider(llm, Some(kind)) {
                Ok(provider) => {
                    self.display_manager.show_info(&format!(
                        "Using {} ({})",
                        provider.provider_name(),
                        provider.model_name()
                    ));
                    pipeline.set_provider(provider);
                }
                Err(e) => self.display_manager.show_error(&e.to_string()),
            },
            Action::Message(message) => self.display_manager.show_info(&message),
            Action::Error(message) => self.display_manager.show_warning(&message),
        }
        Ok(true)
    }
}
