//! Paper Pulse sync command
//!
//! Runs ingestion against the configured store:
//! - `sync`: every standing query, plus the important-papers list
//! - `daily`: the last two days of every standing query
//! - `crawl`, `fetch`, `remote`, `stats`

use anyhow::Context;
use clap::{Parser, Subcommand};
use pulse_common::config::{AppConfig, ObservabilityConfig};
use pulse_common::metrics::register_metrics;
use pulse_common::{DbPool, SqlPaperStore, VERSION};
use pulse_ingestion::{
    crawler_stats, ArxivClient, IngestionEngine, SourceOrder, SourceSort, SyncOrchestrator,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pulse-sync", version = VERSION, rename_all = "kebab")]
struct Args {
    /// Configuration file; defaults to the layered `config/` directory
    #[arg(long, short = 'c', value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sync every standing query
    Sync {
        /// Rescan the whole window regardless of stored papers
        #[arg(long)]
        force: bool,
        #[arg(long)]
        years_back: Option<u32>,
        #[arg(long)]
        max_results: Option<usize>,
        /// Skip the important-papers list
        #[arg(long)]
        skip_important: bool,
    },
    /// Pick up the last two days of every standing query
    Daily {
        #[arg(long)]
        max_results: Option<usize>,
    },
    /// Pull the newest papers of the given categories
    Crawl {
        #[arg(required = true)]
        categories: Vec<String>,
        #[arg(long, default_value_t = 100)]
        max_results: usize,
    },
    /// Fetch and store a single paper by id or URL
    Fetch { id: String },
    /// Run an ad hoc remote search and store new papers
    Remote {
        query: String,
        #[arg(long, default_value_t = 15)]
        max_results: usize,
    },
    /// Print crawler statistics
    Stats,
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    if config.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .pretty()
            .init();
    }
}

/// Create the parent directory of a file-backed SQLite database
fn ensure_sqlite_dir(url: &str) -> anyhow::Result<()> {
    let Some(rest) = url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating database directory {}", parent.display()))?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::from_file(&path.to_string_lossy()),
        None => AppConfig::load(),
    }
    .context("loading configuration")?;

    init_tracing(&config.observability);
    register_metrics();
    info!(service = %config.observability.service_name, "Starting Paper Pulse sync v{}", VERSION);

    ensure_sqlite_dir(&config.database.url)?;
    let pool = DbPool::new(&config.database).await?;
    let store = Arc::new(SqlPaperStore::new(pool));
    store.ensure_schema().await?;

    let source = Arc::new(ArxivClient::new(&config.source)?);
    let sort_by = config.source.sort_by.parse::<SourceSort>().unwrap_or_default();
    let sort_order = config.source.sort_order.parse::<SourceOrder>().unwrap_or_default();
    if sort_by != SourceSort::SubmittedDate || sort_order != SourceOrder::Descending {
        warn!(
            sort_by = sort_by.as_str(),
            sort_order = sort_order.as_str(),
            "Source order is not newest-first, cutoff early stop may end scans too soon"
        );
    }

    let engine = Arc::new(
        IngestionEngine::new(store.clone(), source)
            .with_query_delay(config.query_delay())
            .with_fetch_delay(config.important_delay())
            .with_source_order(sort_by, sort_order),
    );
    let orchestrator = SyncOrchestrator::new(engine.clone(), config.sync.queries.clone());

    let command = args.command.unwrap_or(Command::Sync {
        force: false,
        years_back: None,
        max_results: None,
        skip_important: false,
    });

    match command {
        Command::Sync {
            force,
            years_back,
            max_results,
            skip_important,
        } => {
            if config.sync.queries.is_empty() {
                warn!("No standing queries configured");
            }
            let report = orchestrator
                .sync_all_queries(
                    years_back.unwrap_or(config.sync.years_back),
                    force,
                    max_results.unwrap_or(config.sync.max_results),
                )
                .await;
            for result in report.query_results.iter().filter(|r| !r.is_ok()) {
                error!(query = %result.query, error = ?result.error, "Query sync failed");
            }
            info!(total_new_papers = report.total_new_papers, "Sync complete");

            if let (false, Some(path)) = (skip_important, &config.sync.important_papers_file) {
                match engine.sync_important_papers(path).await {
                    Ok(outcome) => {
                        for message in &outcome.errors {
                            warn!(%message, "Important paper not added");
                        }
                    }
                    Err(e) => warn!(error = %e, "Important papers skipped"),
                }
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Daily { max_results } => {
            let report = orchestrator
                .daily_update(max_results.unwrap_or(config.sync.max_results))
                .await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Crawl {
            categories,
            max_results,
        } => {
            let report = orchestrator.crawl_categories(&categories, max_results).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Fetch { id } => match engine.quick_fetch(&id).await? {
            Some(paper) => println!("{}", serde_json::to_string_pretty(&paper)?),
            None => warn!(%id, "Paper not found on arXiv"),
        },
        Command::Remote { query, max_results } => {
            let outcome = engine.remote_search(&query, max_results).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Stats => {
            let stats = crawler_stats(store.as_ref()).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
