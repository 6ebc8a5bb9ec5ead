//! Command-line argument parsing for mtgjudge
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::collections::CollectionKind;
use crate::config::ProviderKind;
use crate::rag::{AskOptions, SearchLimits};

/// mtgjudge - answer Magic: The Gathering rules questions from the official texts
#[derive(Parser, Debug)]
#[command(name = "mtgjudge")]
#[command(version)]
#[command(about = "Rules questions answered from the Comprehensive Rules, card text and rulings", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (warnings and errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Retrieval and generation overrides shared by `ask` and `batch`
#[derive(ClapArgs, Debug, Clone, Default, PartialEq)]
pub struct AskArgs {
    /// Rules to retrieve
    #[arg(long)]
    pub rules: Option<usize>,

    /// Cards to retrieve
    #[arg(long)]
    pub cards: Option<usize>,

    /// Rulings to retrieve
    #[arg(long)]
    pub rulings: Option<usize>,

    /// Minimum similarity score for a hit to be used
    #[arg(long)]
    pub min_score: Option<f32>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Language model provider
    #[arg(long, value_enum)]
    pub provider: Option<ProviderKind>,

    /// Include search results and context in the output
    #[arg(long)]
    pub debug: bool,
}

impl AskArgs {
    /// Apply the overrides on top of `base`
    pub fn apply(&self, base: AskOptions) -> AskOptions {
        AskOptions {
            limits: SearchLimits {
                rules: self.rules.unwrap_or(base.limits.rules),
                cards: self.cards.unwrap_or(base.limits.cards),
                rulings: self.rulings.unwrap_or(base.limits.rulings),
            },
            min_score: self.min_score.unwrap_or(base.min_score),
            temperature: self.temperature.unwrap_or(base.temperature),
            max_tokens: base.max_tokens,
            include_debug: self.debug || base.include_debug,
        }
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer one question
    Ask {
        /// The rules question
        #[arg(value_name = "QUESTION")]
        question: String,

        #[command(flatten)]
        options: AskArgs,
    },

    /// Answer one question per line of a file ("-" for stdin)
    Batch {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        options: AskArgs,
    },

    /// Create the collections and import rules, cards and rulings
    Ingest {
        /// Comprehensive Rules text file
        #[arg(long, value_name = "PATH")]
        rules: Option<PathBuf>,

        /// MTGJSON AtomicCards.json
        #[arg(long, value_name = "PATH")]
        cards: Option<PathBuf>,

        /// Do not import rulings from the cards file
        #[arg(long)]
        skip_rulings: bool,

        /// Do not import card text from the cards file
        #[arg(long)]
        skip_cards: bool,

        /// Objects per batch
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Create the three collections
    Schema,

    /// Run one generative task over the closest entries of a collection
    Summarize {
        #[arg(value_name = "QUERY")]
        query: String,

        #[arg(long, value_enum, default_value_t = CollectionKind::Rules)]
        collection: CollectionKind,

        #[arg(long, default_value_t = 5)]
        limit: usize,

        /// Instruction for the model
        #[arg(long)]
        task: Option<String>,
    },

    /// Run system diagnostics and health checks
    Doctor,

    /// Display current configuration
    Config {
        /// Write the default configuration file
        #[arg(long)]
        init: bool,
    },

    /// Start interactive REPL mode
    Start,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Default `tracing` filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "warn,mtgjudge=info",
            Verbosity::Verbose => "info,mtgjudge=debug",
            Verbosity::VeryVerbose => "debug,mtgjudge=trace",
        }
    }

    /// Check if should show progress bars
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        let args = Args::parse_from(["mtgjudge", "-q", "doctor"]);
        assert_eq!(args.verbosity(), Verbosity::Quiet);

        let args = Args::parse_from(["mtgjudge", "doctor"]);
        assert_eq!(args.verbosity(), Verbosity::Normal);

        let args = Args::parse_from(["mtgjudge", "-v", "doctor"]);
        assert_eq!(args.verbosity(), Verbosity::Verbose);

        let args = Args::parse_from(["mtgjudge", "doctor", "-vv"]);
        assert_eq!(args.verbosity(), Verbosity::VeryVerbose);
    }

    #[test]
    fn test_verbosity_methods() {
        assert!(!Verbosity::Quiet.show_progress());
        assert!(Verbosity::Normal.show_progress());
        assert_eq!(Verbosity::Quiet.log_filter(), "warn");
        assert!(Verbosity::Verbose.log_filter().contains("mtgjudge=debug"));
    }

    #[test]
    fn test_ask_arguments() {
        let args = Args::parse_from([
            "mtgjudge",
            "--json",
            "ask",
            "How does trample work?",
            "--rules",
            "5",
            "--min-score",
            "0.6",
            "--provider",
            "anthropic",
        ]);
        assert!(args.json);
        match args.command {
            Commands::Ask { question, options } => {
                assert_eq!(question, "How does trample work?");
                assert_eq!(options.rules, Some(5));
                assert_eq!(options.provider, Some(ProviderKind::Anthropic));

                let applied = options.apply(AskOptions::default());
                assert_eq!(applied.limits.rules, 5);
                assert_eq!(applied.limits.cards, 3);
                assert_eq!(applied.min_score, 0.6);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_ingest_arguments() {
        let args = Args::parse_from([
            "mtgjudge",
            "ingest",
            "--cards",
            "AtomicCards.json",
            "--skip-rulings",
            "--batch-size",
            "100",
        ]);
        match args.command {
            Commands::Ingest {
                rules,
                cards,
                skip_rulings,
                skip_cards,
                batch_size,
            } => {
                assert!(rules.is_none());
                assert_eq!(cards, Some(PathBuf::from("AtomicCards.json")));
                assert!(skip_rulings);
                assert!(!skip_cards);
                assert_eq!(batch_size, Some(100));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_summarize_defaults() {
        let args = Args::parse_from(["mtgjudge", "summarize", "deathtouch"]);
        match args.command {
            Commands::Summarize {
                collection, limit, task, ..
            } => {
                assert_eq!(collection, CollectionKind::Rules);
                assert_eq!(limit, 5);
                assert!(task.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
