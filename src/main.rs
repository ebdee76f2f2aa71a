//! # corpus-sync CLI (`csx`)
//!
//! ## Usage
//!
//! ```bash
//! csx --config ./config/corpus.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `csx init` | Create the SQLite store and run schema migrations |
//! | `csx sources` | List configured data sources and their health |
//! | `csx sync` | Reconcile the index with the configured sources |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the store
//! csx init --config ./config/corpus.toml
//!
//! # See what a run would do without touching the index
//! csx sync --dry-run
//!
//! # Reconcile, one file at a time
//! csx sync --sequential
//!
//! # Re-index everything that is still on disk
//! csx sync --full
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use corpus_sync::chunker::CharChunker;
use corpus_sync::config::{load_config, Config};
use corpus_sync::loader::TextFileLoader;
use corpus_sync::reconcile::{
    ExecutionStrategy, NoopRebuild, ReconciliationCoordinator, SyncOptions,
};
use corpus_sync::registry;
use corpus_sync::store::sqlite::SqliteIndex;
use corpus_sync::{db, migrate};

/// corpus-sync — incremental synchronization of file-based document
/// collections into a chunked document store.
#[derive(Parser)]
#[command(
    name = "csx",
    about = "corpus-sync — incremental document collection synchronization",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/corpus.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the store schema. Idempotent.
    Init,

    /// List configured data sources and their health status.
    Sources {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Reconcile the document index with the configured sources.
    Sync {
        /// Classify only; print the plan without mutating the index.
        #[arg(long)]
        dry_run: bool,

        /// Process files one at a time instead of fanning out.
        #[arg(long)]
        sequential: bool,

        /// Ignore recorded hashes and re-index every present file.
        #[arg(long)]
        full: bool,

        /// Emit the report as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => run_init(&config).await,
        Commands::Sources { json } => run_sources(&config, json),
        Commands::Sync {
            dry_run,
            sequential,
            full,
            json,
        } => run_sync(&config, dry_run, sequential, full, json).await,
    }
}

async fn run_init(config: &Config) -> Result<()> {
    let pool = db::connect(&config.store.path).await?;
    migrate::run_migrations(&pool).await?;
    pool.close().await;
    println!("initialized {}", config.store.path.display());
    Ok(())
}

fn run_sources(config: &Config, json: bool) -> Result<()> {
    let statuses = registry::source_statuses(config);

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    println!(
        "{:<16} {:<12} {:<8} {:<8} NOTES",
        "SOURCE", "CATEGORY", "ENABLED", "HEALTHY"
    );
    for status in statuses {
        println!(
            "{:<16} {:<12} {:<8} {:<8} {}",
            status.name,
            status.category,
            status.enabled,
            status.healthy,
            status.notes.unwrap_or_default()
        );
    }
    Ok(())
}

async fn run_sync(
    config: &Config,
    dry_run: bool,
    sequential: bool,
    full: bool,
    json: bool,
) -> Result<()> {
    let sources = registry::list_sources(config);
    if sources.is_empty() {
        anyhow::bail!("no enabled data sources configured");
    }

    let pool = db::connect(&config.store.path).await?;
    migrate::run_migrations(&pool).await?;
    let index = Arc::new(SqliteIndex::new(pool));

    let strategy = if sequential {
        ExecutionStrategy::Sequential
    } else {
        ExecutionStrategy::Concurrent {
            workers: config.sync.workers,
        }
    };

    let mut options = SyncOptions::from_config(config);
    options.dry_run = dry_run;
    options.full_resync = full;

    let coordinator = ReconciliationCoordinator::new(
        index.clone(),
        Arc::new(TextFileLoader::new(config.chunking.max_file_bytes)),
        Arc::new(CharChunker::new(
            config.chunking.chunk_size,
            config.chunking.overlap,
        )),
        Arc::new(NoopRebuild),
        strategy,
        options,
    );

    let report = coordinator.run(&sources).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render());
    }

    index.pool().close().await;
    Ok(())
}
