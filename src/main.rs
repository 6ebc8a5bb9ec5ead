//! mtgjudge - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use mtgjudge::collections::CollectionKind;
use mtgjudge::config::Config;
use mtgjudge::corpus::{load_rulebook, AtomicCards};
use mtgjudge::ingest::{IngestReport, Ingestor};
use mtgjudge::llm::{build_provider, GenerationConfig};
use mtgjudge::rag::{AskOptions, BatchEntry, JudgePipeline};
use mtgjudge::repl::{DisplayManager, ReplSession};
use mtgjudge::store::build_store;
use mtgjudge::{
    cli::{load_questions, Args, AskArgs, Commands},
    doctor::Doctor,
    logging,
};
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Writing the default file must work even when the current one is broken
    if let Commands::Config { init: true } = &args.command {
        return init_config(args.config.as_deref());
    }

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    logging::init(&config.log_dir(), args.verbosity().log_filter());

    match &args.command {
        Commands::Ask { question, options } => {
            run_ask(&args, &config, question, options).await?;
        }
        Commands::Batch { file, options } => {
            run_batch(&args, &config, file, options).await?;
        }
        Commands::Ingest {
            rules,
            cards,
            skip_rulings,
            skip_cards,
            batch_size,
        } => {
            let plan = IngestPlan {
                rules: rules.as_deref(),
                cards: cards.as_deref(),
                skip_rulings: *skip_rulings,
                skip_cards: *skip_cards,
                batch_size: *batch_size,
            };
            run_ingest(&args, &config, plan).await?;
        }
        Commands::Schema => {
            run_schema(&config).await?;
        }
        Commands::Summarize {
            query,
            collection,
            limit,
            task,
        } => {
            run_summarize(&config, *collection, query, *limit, task.as_deref()).await?;
        }
        Commands::Doctor => {
            run_doctor(&args, config).await?;
        }
        Commands::Config { .. } => {
            show_config(&args, &config)?;
        }
        Commands::Start => {
            run_repl(&config).await?;
        }
    }

    Ok(())
}

async fn build_pipeline(config: &Config, options: &AskArgs) -> Result<JudgePipeline> {
    let store = build_store(config).await?;
    let provider = build_provider(&config.llm, options.provider)?;
    Ok(JudgePipeline::new(store, &config.store.collections, provider)
        .with_generation(GenerationConfig::from(&config.llm)))
}

async fn run_ask(args: &Args, config: &Config, question: &str, options: &AskArgs) -> Result<()> {
    let ask = options.apply(AskOptions::from_config(config));
    ask.validate().context("Invalid ask options")?;
    let pipeline = build_pipeline(config, options).await?;

    let mut display = DisplayManager::new();
    if args.verbosity().show_progress() && !args.json {
        display.start_spinner("Consulting the rules...");
    }

    let answer = pipeline.answer_question(question, &ask).await;
    display.finish_current();
    let answer = answer?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        display.show_answer(&answer, ask.include_debug);
    }
    Ok(())
}

async fn run_batch(args: &Args, config: &Config, file: &Path, options: &AskArgs) -> Result<()> {
    let questions = load_questions(file)
        .with_context(|| format!("Failed to read questions from {}", file.display()))?;
    if questions.is_empty() {
        println!("No questions found in {}", file.display());
        return Ok(());
    }

    let ask = options.apply(AskOptions::from_config(config));
    ask.validate().context("Invalid ask options")?;
    let pipeline = build_pipeline(config, options).await?;

    let mut display = DisplayManager::new();
    if args.verbosity().show_progress() && !args.json {
        display.start_spinner(&format!("Answering {} questions...", questions.len()));
    }
    let entries = pipeline.batch_answer_questions(&questions, &ask).await;
    display.finish_current();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for (i, entry) in entries.iter().enumerate() {
        display.show_section(&format!("Question {}: {}", i + 1, entry.question()));
        match entry {
            BatchEntry::Answered(answer) => display.show_answer(answer, ask.include_debug),
            BatchEntry::Failed { answer, .. } => display.show_error(answer),
        }
    }

    let failed = entries.iter().filter(|e| e.is_error()).count();
    if failed > 0 {
        eprintln!("{} of {} questions failed", failed, entries.len());
    }
    Ok(())
}

struct IngestPlan<'a> {
    rules: Option<&'a Path>,
    cards: Option<&'a Path>,
    skip_rulings: bool,
    skip_cards: bool,
    batch_size: Option<usize>,
}

async fn run_ingest(args: &Args, config: &Config, plan: IngestPlan<'_>) -> Result<()> {
    let mut ingest_config = config.ingest.clone();
    if let Some(batch_size) = plan.batch_size {
        ingest_config.batch_size = batch_size;
    }
    let max_errors = ingest_config.max_errors;

    let store = build_store(config).await?;
    let mut ingestor = Ingestor::new(store, ingest_config);
    if args.verbosity().show_progress() && !args.json {
        ingestor = ingestor.with_progress(DisplayManager::new().ingest_bar());
    }

    let schemas = ingestor.create_schemas(&config.store.collections).await?;
    let (rules_schema, cards_schema, rulings_schema) = (&schemas[0], &schemas[1], &schemas[2]);

    let mut reports: Vec<IngestReport> = Vec::new();

    if let Some(path) = plan.rules {
        let entries = load_rulebook(path)
            .with_context(|| format!("Failed to load rules from {}", path.display()))?;
        reports.push(ingestor.ingest_rules(rules_schema, &entries).await?);
    }

    if let Some(path) = plan.cards {
        let cards = AtomicCards::from_path(path)
            .with_context(|| format!("Failed to load cards from {}", path.display()))?;
        if !plan.skip_cards {
            reports.push(ingestor.ingest_cards(cards_schema, &cards).await?);
        }
        if !plan.skip_rulings {
            reports.push(ingestor.ingest_rulings(rulings_schema, &cards).await?);
        }
    }

    if reports.is_empty() {
        println!("Collections ready; pass --rules or --cards to import data.");
        return Ok(());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_report(report);
        }
    }

    for report in &reports {
        report.ensure_complete(max_errors)?;
    }
    Ok(())
}

fn print_report(report: &IngestReport) {
    let status = if report.aborted {
        "ABORTED".red().bold()
    } else if report.failed > 0 {
        "PARTIAL".yellow().bold()
    } else {
        "OK".green().bold()
    };
    println!(
        "{} {}: {} submitted, {} inserted, {} failed",
        status, report.collection, report.submitted, report.inserted, report.failed
    );
    for error in &report.errors {
        println!("    {}", error.dimmed());
    }
}

async fn run_schema(config: &Config) -> Result<()> {
    let store = build_store(config).await?;
    let ingestor = Ingestor::new(store, config.ingest.clone());
    for schema in ingestor.create_schemas(&config.store.collections).await? {
        println!("{} {} ({})", "✓".green(), schema.name, schema.kind);
    }
    Ok(())
}

async fn run_summarize(
    config: &Config,
    kind: CollectionKind,
    query: &str,
    limit: usize,
    task: Option<&str>,
) -> Result<()> {
    let pipeline = build_pipeline(config, &AskArgs::default()).await?;
    let summary = pipeline.summarize(kind, query, limit, task).await?;
    if summary.is_empty() {
        println!("No {} matched \"{}\"", kind, query);
    } else {
        println!("{}", summary);
    }
    Ok(())
}

async fn run_doctor(args: &Args, config: Config) -> Result<()> {
    let checks = Doctor::new(config).run_diagnostics().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&checks)?);
    } else {
        Doctor::display_results(&checks);
    }

    std::process::exit(if Doctor::overall_status(&checks) { 0 } else { 1 });
}

async fn run_repl(config: &Config) -> Result<()> {
    let mut pipeline = build_pipeline(config, &AskArgs::default()).await?;
    let options = AskOptions::from_config(config);
    let history = config.state_dir().join("history");

    let mut repl = ReplSession::with_history(options, history)?;
    repl.run(&mut pipeline, &config.llm).await
}

fn init_config(path: Option<&Path>) -> Result<()> {
    let path: PathBuf = match path {
        Some(path) => path.to_path_buf(),
        None => Config::default_path().context("Cannot determine home directory")?,
    };
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    Config::default().save(&path)?;
    println!("{} Wrote {}", "✓".green(), path.display());
    Ok(())
}

fn show_config(args: &Args, config: &Config) -> Result<()> {
    let shown = config.redacted();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    println!("\n{}", "mtgjudge Configuration".bold().cyan());
    println!("{}\n", "=".repeat(60).cyan());
    print!("{}", toml::to_string_pretty(&shown)?);
    println!();
    println!("Verbosity: {}", args.verbosity().as_str());
    Ok(())
}
