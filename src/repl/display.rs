//! Display manager for terminal output
//!
//! Spinners, progress bars and colored rendering of answers.

use colored::*;
use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::time::Duration;

use crate::rag::{Answer, SourceCounts};
use crate::repl::commands::HELP;

/// One-line summary of retrieval counts
pub fn sources_line(counts: &SourceCounts) -> String {
    format!(
        "Sources: {} rules, {} cards, {} rulings",
        counts.rules, counts.cards, counts.rulings
    )
}

pub struct DisplayManager {
    current_bar: Option<ProgressBar>,
    update_interval: Duration,
}

impl DisplayManager {
    /// Update frequency: 10 FPS (100ms interval)
    pub fn new() -> Self {
        DisplayManager {
            current_bar: None,
            update_interval: Duration::from_millis(100),
        }
    }

    /// Show welcome banner
    pub fn show_banner(&self, version: &str, backend: &str, model: &str) {
        let width = 64;
        let rule = "=".repeat(width);
        let title = format!("  mtgjudge {} - Magic: The Gathering Rules Judge", version);
        let info = format!("  Store: {} | Model: {}", backend, model);

        println!("\n{}", rule.cyan());
        println!("{}", title.bold().cyan());
        println!("{}", info.dimmed());
        println!("{}\n", rule.cyan());
        println!(
            "Ask a rules question (or {} for commands, {} to quit)\n",
            "/help".green(),
            "/exit".green()
        );
    }

    /// Spinner shown while the pipeline runs
    pub fn start_spinner(&mut self, message: &str) -> ProgressBar {
        self.finish_current();

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(self.update_interval);

        self.current_bar = Some(pb.clone());
        pb
    }

    /// Bar advanced per imported batch
    pub fn ingest_bar(&self) -> ProgressBar {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:40.green/blue}] {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb
    }

    pub fn finish_current(&mut self) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish_and_clear();
        }
    }

    /// Render an answer; the context block only with `debug`
    pub fn show_answer(&mut self, answer: &Answer, debug: bool) {
        self.finish_current();

        println!();
        if answer.generation_failed {
            println!("{}", answer.answer.red());
        } else {
            println!("{}", answer.answer);
        }
        println!("\n{}", sources_line(&answer.sources_found).dimmed());

        if debug {
            if let Some(info) = &answer.debug {
                self.show_section("Retrieved Context");
                println!("{}", info.formatted_context.dimmed());
            }
        }
        println!();
    }

    pub fn show_sources(&self, counts: Option<&SourceCounts>) {
        match counts {
            Some(counts) => println!("{}", sources_line(counts).cyan()),
            None => self.show_info("No question asked yet"),
        }
    }

    pub fn show_help(&self) {
        println!("\n{}", "Available Commands:".bold().cyan());
        println!("{}", "=".repeat(60).cyan());
        for (command, description) in HELP {
            println!("  {:<22} {}", command.green(), description);
        }
        println!("\nAnything else is asked as a rules question.\n");
    }

    pub fn show_error(&self, error: &str) {
        println!("{} {}", "Error:".red().bold(), error.red());
    }

    pub fn show_warning(&self, warning: &str) {
        println!("{} {}", "Warning:".yellow().bold(), warning.yellow());
    }

    pub fn show_info(&self, info: &str) {
        println!("{} {}", "Info:".cyan(), info);
    }

    pub fn clear_screen(&self) -> io::Result<()> {
        execute!(io::stdout(), Clear(ClearType::All), cursor::MoveTo(0, 0))
    }

    pub fn show_section(&self, title: &str) {
        println!("\n{}", title.bold().cyan());
        println!("{}", "-".repeat(60).cyan());
    }
}

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_line() {
        let counts = SourceCounts {
            rules: 3,
            cards: 1,
            rulings: 0,
        };
        assert_eq!(sources_line(&counts), "Sources: 3 rules, 1 cards, 0 rulings");
    }

    #[test]
    fn test_spinner_lifecycle() {
        let mut manager = DisplayManager::new();
        let pb = manager.start_spinner("Consulting the rules...");
        assert!(manager.current_bar.is_some());
        assert_eq!(pb.message(), "Consulting the rules...");

        manager.finish_current();
        assert!(manager.current_bar.is_none());
    }

    #[test]
    fn test_ingest_bar_starts_empty() {
        let manager = DisplayManager::new();
        let pb = manager.ingest_bar();
        assert_eq!(pb.position(), 0);
        pb.finish_and_clear();
    }

    #[test]
    fn test_update_interval() {
        let manager = DisplayManager::new();
        assert_eq!(manager.update_interval, Duration::from_millis(100));
    }
}
