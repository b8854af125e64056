//! Falba CLI
//!
//! ## Commands
//!
//! - `ab`: print `<test>/<run>` for every run matching an expression
//! - `dump`: human-readable facts and metrics of every (matching) run
//! - `flat`: one JSON object per metric, facts denormalized alongside
//!
//! Diagnostics go to stderr; only command output is written to stdout.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};

use falba::enrich::DEFAULT_ARCHIVE_DEPTH;
use falba::model::{Corpus, Run};
use falba::query::{filter_corpus, Predicate};
use falba::telemetry::init_tracing;
use falba::Pipeline;

#[derive(Parser)]
#[command(name = "falba")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Benchmark result enrichment and filtering", long_about = None)]
struct Cli {
    /// Result database root: <root>/<test_name>/<run_id>/<artifacts>
    #[arg(long, global = true, env = "FALBA_RESULT_DB", default_value = "./results")]
    result_db: PathBuf,

    /// Levels of nested .tar.gz archives to enrich (0 disables)
    #[arg(long, global = true, env = "FALBA_ARCHIVE_DEPTH", default_value_t = DEFAULT_ARCHIVE_DEPTH)]
    archive_depth: usize,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every run matching a CEL expression
    Ab {
        /// Boolean expression over facts, `run_id` and `test_name`
        expr: String,
    },

    /// Dump facts and metrics
    Dump {
        /// Only dump runs matching this expression
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Emit one JSON line per metric
    Flat,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let corpus = load(&cli.result_db, cli.archive_depth)?;

    match cli.command {
        Commands::Ab { expr } => cmd_ab(&corpus, &expr),
        Commands::Dump { filter } => cmd_dump(&corpus, filter.as_deref()),
        Commands::Flat => cmd_flat(&corpus),
    }
}

/// Read, enrich and derive the corpus under `root`.
fn load(root: &Path, archive_depth: usize) -> Result<Corpus> {
    let mut corpus = Corpus::read_dir(root)
        .with_context(|| format!("Failed to read result database {}", root.display()))?;
    if corpus.is_empty() {
        bail!("No runs found under {}", root.display());
    }

    let pipeline = Pipeline::builder().archive_depth(archive_depth).build();
    pipeline.enrich(&mut corpus).log("enrich");
    pipeline.derive(&mut corpus).log("derive");
    Ok(corpus)
}

/// Runs matching `expr`, with per-run failures logged.
fn select<'a>(corpus: &'a Corpus, expr: &str) -> Result<Vec<&'a Run>> {
    let predicate = Predicate::compile(expr).context("Invalid filter expression")?;
    let outcome = filter_corpus(corpus, &predicate);

    for (key, error) in &outcome.failures {
        warn!(run = %key, "{error}");
    }
    if !outcome.failures.is_empty() {
        warn!(failed = outcome.failures.len(), "runs excluded by evaluation failure");
    }

    Ok(outcome
        .matches
        .iter()
        .filter_map(|key| corpus.get(key))
        .collect())
}

fn cmd_ab(corpus: &Corpus, expr: &str) -> Result<()> {
    let runs = select(corpus, expr)?;

    let mut out = io::stdout().lock();
    for run in &runs {
        writeln!(out, "{}", run.key())?;
    }
    info!(matches = runs.len(), "query complete");
    Ok(())
}

fn cmd_dump(corpus: &Corpus, filter: Option<&str>) -> Result<()> {
    let runs = match filter {
        Some(expr) => select(corpus, expr)?,
        None => corpus.runs().collect(),
    };

    let mut out = io::stdout().lock();
    for run in runs {
        writeln!(out, "{}", run.key())?;
        writeln!(out, "  facts:")?;
        for fact in run.facts().values() {
            write!(out, "    {} = {}", fact.name(), fact.value())?;
            match fact.unit() {
                Some(unit) => writeln!(out, " {unit}")?,
                None => writeln!(out)?,
            }
        }
        writeln!(out, "  metrics:")?;
        for metric in run.metrics() {
            write!(out, "    {} = {}", metric.name(), metric.value())?;
            match metric.unit() {
                Some(unit) => writeln!(out, " {unit}")?,
                None => writeln!(out)?,
            }
        }
    }
    Ok(())
}

fn cmd_flat(corpus: &Corpus) -> Result<()> {
    let mut out = io::stdout().lock();
    for record in corpus.flat_records() {
        serde_json::to_writer(&mut out, &record).context("Failed to serialize record")?;
        writeln!(out)?;
    }
    Ok(())
}
