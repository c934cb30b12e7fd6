//! # situ
//!
//! Play the situational-puzzle experiment in a terminal, or inspect the
//! pieces that drive it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use situ_core::{
    classify_detailed, Catalog, Condition, ContractBuilder, FeedbackPolicy, FeedbackStrategy,
    Phase, DEFAULT_MAX_QUESTIONS,
};
use situ_runtime::{ProviderRegistry, RuntimeConfig, SessionControllerBuilder, SessionStore};

#[derive(Parser, Debug)]
#[command(name = "situ", version, about = "Situational-puzzle experiment")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play the puzzles interactively on stdin
    Play {
        /// sincere, flattery, neutral (or 1-3)
        #[arg(long, short, default_value = "sincere")]
        condition: Condition,

        /// Provider type (groq, anthropic, scripted)
        #[arg(long)]
        provider: Option<String>,

        /// model or canned
        #[arg(long)]
        strategy: Option<FeedbackStrategy>,

        /// Runtime config (YAML)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show how utterances are classified
    Classify {
        /// One utterance per argument
        #[arg(required = true)]
        texts: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// Print the system contract for one turn
    Contract {
        #[arg(long, short, default_value = "sincere")]
        condition: Condition,

        /// Puzzle id
        #[arg(long, short, default_value_t = 1)]
        puzzle: u32,

        #[arg(long, default_value = "awaiting_input")]
        phase: Phase,

        /// Questions asked, counting the current one
        #[arg(long, default_value_t = 1)]
        asked: u32,

        #[arg(long, default_value = "model")]
        strategy: FeedbackStrategy,

        /// Catalog file; embedded catalog when omitted
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Validate a catalog and list its puzzles
    Catalog {
        /// Catalog file (YAML or JSON); embedded catalog when omitted
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Play {
            condition,
            provider,
            strategy,
            config,
        } => play(condition, provider, strategy, config).await,
        Command::Classify { texts, json } => classify(&texts, json),
        Command::Contract {
            condition,
            puzzle,
            phase,
            asked,
            strategy,
            catalog,
        } => contract(condition, puzzle, phase, asked, strategy, catalog),
        Command::Catalog { file } => catalog(file),
    }
}

async fn play(
    condition: Condition,
    provider: Option<String>,
    strategy: Option<FeedbackStrategy>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = match &config_path {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    let mut config = config.with_env_overrides()?;
    if let Some(provider) = provider {
        config.provider = provider;
    }
    if let Some(strategy) = strategy {
        config.feedback_strategy = strategy;
    }

    let controller =
        SessionControllerBuilder::from_config(&config, &ProviderRegistry::with_defaults())
            .with_context(|| format!("Failed to set up provider '{}'", config.provider))?
            .build()?;
    let store = SessionStore::new(Arc::new(controller));

    let (id, intro) = store.create(condition)?;
    println!("{}\n", intro);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let reply = tokio::select! {
            result = store.submit(id, text) => result,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("Interrupted.");
                break;
            }
        };

        match reply {
            Ok(reply) => println!("\n{}\n", reply),
            Err(e) if e.is_retryable() => eprintln!("{} (try again)", e),
            Err(e) => return Err(e.into()),
        }

        if store.snapshot(id).await?.is_done() {
            break;
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct ClassifyRow<'a> {
    text: &'a str,
    is_yes_no: bool,
    rule: String,
}

fn classify(texts: &[String], json: bool) -> Result<()> {
    let rows: Vec<_> = texts
        .iter()
        .map(|text| {
            let result = classify_detailed(text);
            ClassifyRow {
                text: text.as_str(),
                is_yes_no: result.is_yes_no,
                rule: result.rule.to_string(),
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for row in rows {
            let verdict = if row.is_yes_no { "yes/no" } else { "open" };
            println!("{:<7} {:<20} {}", verdict, row.rule, row.text);
        }
    }
    Ok(())
}

fn load_catalog(path: Option<PathBuf>) -> Result<Catalog> {
    match path {
        Some(path) => Catalog::from_file(&path)
            .with_context(|| format!("Failed to load catalog {}", path.display())),
        None => Ok(Catalog::builtin()?),
    }
}

fn contract(
    condition: Condition,
    puzzle_id: u32,
    phase: Phase,
    asked: u32,
    strategy: FeedbackStrategy,
    catalog_path: Option<PathBuf>,
) -> Result<()> {
    let catalog = load_catalog(catalog_path)?;
    let Some(puzzle) = catalog.get(puzzle_id) else {
        bail!("No puzzle {} (catalog has {})", puzzle_id, catalog.len());
    };

    let payload = ContractBuilder::new(puzzle)
        .condition(condition)
        .phase(phase)
        .policy(FeedbackPolicy::new(strategy))
        .questions(asked, DEFAULT_MAX_QUESTIONS)
        .puzzles_total(catalog.len())
        .build();

    println!("{}", payload.system);
    Ok(())
}

fn catalog(path: Option<PathBuf>) -> Result<()> {
    let catalog = load_catalog(path)?;
    for puzzle in catalog.iter() {
        println!("{:>2}. {} ({} rules)", puzzle.id, puzzle.slug, puzzle.rules.len());
        println!("    Q: {}", puzzle.question);
        println!("    A: {}", puzzle.answer);
        for rule in &puzzle.rules {
            println!("    {} {:<12} {}", rule.id, rule.verdict.as_str(), rule.description);
        }
    }
    Ok(())
}
