use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tally_core::TransactionId;
use tally_engine::{CategorizationSession, CategoryChoice, Matcher, StatementFile};
use tally_import::LayoutRegistry;
use tally_store::{CorpusStore, TaxonomyStore};

mod config;
use config::Config;

#[derive(Parser)]
#[command(name = "tally", version, about = "Categorize bank and card statement exports")]
struct Cli {
    /// Path to a tally.toml config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse and match statement files, then review unmatched transactions.
    Ingest {
        /// Statement CSV files to process.
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Force one source layout instead of detecting per file.
        #[arg(long)]
        source: Option<String>,
        /// Override the fuzzy acceptance threshold for this run.
        #[arg(long)]
        threshold: Option<f32>,
        /// Skip the interactive review loop.
        #[arg(long)]
        no_review: bool,
    },
    /// List the registered source layouts.
    Sources,
    /// Print the category taxonomy.
    Categories,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Ingest {
            files,
            source,
            threshold,
            no_review,
        } => ingest(cfg, files, source, threshold, no_review),
        Command::Sources => sources(cfg),
        Command::Categories => categories(cfg),
    }
}

fn ingest(
    cfg: Config,
    files: Vec<PathBuf>,
    source: Option<String>,
    threshold: Option<f32>,
    no_review: bool,
) -> anyhow::Result<()> {
    let registry = LayoutRegistry::from_path(&cfg.patterns_file).with_context(|| {
        format!("loading layout registry {}", cfg.patterns_file.display())
    })?;
    let matcher = Matcher::new(threshold.unwrap_or(cfg.fuzzy_threshold));
    let mut session = CategorizationSession::new(
        registry,
        matcher,
        CorpusStore::new(&cfg.corpus_file),
        TaxonomyStore::new(&cfg.taxonomy_file),
    )?;

    let batch: Vec<StatementFile> = files
        .into_iter()
        .map(|path| match &source {
            Some(id) => StatementFile::with_source(path, id.clone()),
            None => StatementFile::new(path),
        })
        .collect();

    let summary = session.ingest(&batch);
    for failure in &summary.failed_files {
        eprintln!("skipped {}: {}", failure.file, failure.error);
    }
    for (file, row_error) in &summary.row_errors {
        eprintln!("{file}: {row_error}");
    }
    if summary.dropped_empty_descriptions > 0 {
        eprintln!(
            "dropped {} row(s) with empty descriptions",
            summary.dropped_empty_descriptions
        );
    }
    println!(
        "{} transaction(s) ingested, {} auto-matched, {} pending review",
        summary.ingested, summary.auto_matched, summary.unmatched
    );

    if !no_review && session.pending_review().count() > 0 {
        review(&mut session)?;
    }

    print_totals(&session);
    Ok(())
}

/// One pass over the pending set: show each transaction, take a
/// `Category / Sub-category` line, and let each correction retroactively
/// resolve its pending twins.
fn review(session: &mut CategorizationSession) -> anyhow::Result<()> {
    let pending: Vec<TransactionId> = session.pending_review().map(|tx| tx.id.clone()).collect();
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    println!("\nReview: enter 'Category / Sub-category', blank to skip, 'q' to stop.");
    let categories: Vec<String> = session.taxonomy().categories().map(String::from).collect();
    if !categories.is_empty() {
        println!("Known categories: {}", categories.join(", "));
    }

    for id in pending {
        // A previous correction may have already resolved this one.
        let Some(tx) = session.get(&id).filter(|tx| !tx.is_categorized()) else {
            continue;
        };
        println!("\n{}  {}  {}", tx.date, tx.description, tx.amount);
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next().transpose()? else {
            break;
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        if line == "q" {
            break;
        }
        let Some((category, sub_category)) = line.split_once('/') else {
            eprintln!("expected 'Category / Sub-category'");
            continue;
        };

        let category = choice(session, category.trim(), None);
        let sub_category = choice(session, sub_category.trim(), Some(&category));
        match session.apply_correction(&id, category, sub_category) {
            Ok(()) => {
                let resolved = session.refresh();
                if resolved > 0 {
                    println!("(+{resolved} similar transaction(s) resolved)");
                }
            }
            Err(e) => eprintln!("correction rejected: {e}"),
        }
    }
    Ok(())
}

/// Maps a typed name onto the taxonomy: known names are `Existing`,
/// anything else is `New`.
fn choice(
    session: &CategorizationSession,
    name: &str,
    parent: Option<&CategoryChoice>,
) -> CategoryChoice {
    let known = match parent {
        None => session.taxonomy().contains_category(name),
        Some(CategoryChoice::Existing(cat)) => session.taxonomy().contains(cat, name),
        Some(CategoryChoice::New(_)) => false,
    };
    if known {
        CategoryChoice::Existing(name.to_string())
    } else {
        CategoryChoice::New(name.to_string())
    }
}

fn print_totals(session: &CategorizationSession) {
    let totals = session.category_totals();
    if totals.is_empty() {
        println!("\nNo categorized transactions yet.");
        return;
    }
    println!("\n{:<20} {:<20} {:>10} {:>6}", "Category", "Sub-category", "Total", "Count");
    for ((category, sub_category), total) in &totals {
        println!(
            "{category:<20} {sub_category:<20} {:>10} {:>6}",
            total.amount.to_string(),
            total.count
        );
    }
    let counts = session.status_counts();
    println!(
        "\n{} of {} categorized ({:.0}%), {} still pending",
        counts.total - counts.unmatched,
        counts.total,
        session.completion() * 100.0,
        counts.unmatched
    );
}

fn sources(cfg: Config) -> anyhow::Result<()> {
    let registry = LayoutRegistry::from_path(&cfg.patterns_file).with_context(|| {
        format!("loading layout registry {}", cfg.patterns_file.display())
    })?;
    if registry.is_empty() {
        println!("No source layouts registered.");
        return Ok(());
    }
    for id in registry.source_ids() {
        // get() cannot miss for an id the registry just produced.
        if let Some(layout) = registry.get(id) {
            println!("{id}: {}", layout.header_row.join(", "));
        }
    }
    Ok(())
}

fn categories(cfg: Config) -> anyhow::Result<()> {
    let taxonomy = TaxonomyStore::new(&cfg.taxonomy_file).load()?;
    if taxonomy.is_empty() {
        println!("No categories yet.");
        return Ok(());
    }
    for category in taxonomy.categories() {
        let subs: Vec<&str> = taxonomy.sub_categories(category).collect();
        println!("{category}: {}", subs.join(", "));
    }
    Ok(())
}
