//! songbook-ingest - song-data ingestion
//!
//! Subcommands:
//! - `run`: one batch run over the source directory
//! - `fetch <id>` / `search <query>`: single on-demand lookup via the external tool
//! - `queue`: print the retry queue and dead-letter archive

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use songbook_common::config::{default_config_path, RootFolderInitializer, RootFolderResolver};
use songbook_ingest::config::{
    load_config, CliOverrides, IngestSettings, ENV_TOOL_PATH, MODULE_NAME,
};
use songbook_ingest::db::{self, SqliteRecordStore};
use songbook_ingest::logging;
use songbook_ingest::services::tool_invoker::DEFAULT_TOOL_NAME;
use songbook_ingest::services::{
    IngestionOrchestrator, RetryQueue, ToolInvoker, ToolOutput,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Command-line arguments for songbook-ingest
#[derive(Parser, Debug)]
#[command(name = "songbook-ingest")]
#[command(about = "Song-data ingestion with retry queue and dead-letter archive")]
#[command(version)]
struct Cli {
    /// Root folder for the database, queue documents and sources
    #[arg(short, long, global = true)]
    root_folder: Option<PathBuf>,

    /// TOML config file (default: ~/.config/songbook/songbook-ingest.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one batch: INIT → (DRAINING) → SCANNING → FINAL_DRAIN → REPORT
    Run {
        /// Directory of source documents
        #[arg(short, long)]
        source_dir: Option<PathBuf>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch one song by external id
    Fetch {
        id: String,
        #[command(flatten)]
        tool: ToolArgs,
    },
    /// Free-text search
    Search {
        query: String,
        #[command(flatten)]
        tool: ToolArgs,
    },
    /// Show pending retries and dead-lettered songs
    Queue,
}

#[derive(Args, Debug)]
struct ToolArgs {
    /// External tool executable
    #[arg(long, env = ENV_TOOL_PATH)]
    tool_path: Option<PathBuf>,

    /// Per-attempt timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Maximum attempts
    #[arg(long)]
    retries: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Before resolution so config warnings are not lost
    let log_handle = logging::init(cli.log_level.as_deref());

    let config_path = cli
        .config
        .clone()
        .or_else(|| default_config_path(MODULE_NAME))
        .unwrap_or_else(|| PathBuf::from(format!("{}.toml", MODULE_NAME)));

    // Resolve root folder: CLI → env → TOML → compiled default
    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_override(cli.root_folder.clone())
        .with_config_path(config_path.clone())
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;

    let toml_config = load_config(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let overrides = cli_overrides(&cli);
    let settings = IngestSettings::resolve(
        initializer.root_folder().to_path_buf(),
        &toml_config,
        &overrides,
    );

    log_handle.apply_level(&settings.log_level);

    info!(
        "Starting songbook-ingest {} ({}, {} build, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP")
    );
    info!("Root folder: {}", settings.root_folder.display());

    match cli.command {
        Command::Run { json, .. } => run_batch(&settings, json).await,
        Command::Fetch { id, .. } => {
            let invoker = tool_invoker(&settings)?;
            let output = invoker
                .fetch(&id, settings.tool.timeout, settings.tool.retries)
                .await
                .with_context(|| format!("Fetch of {} failed", id))?;
            print_tool_output(&settings, output)
        }
        Command::Search { query, .. } => {
            let invoker = tool_invoker(&settings)?;
            let output = invoker
                .search(&query, settings.tool.timeout, settings.tool.retries)
                .await
                .with_context(|| format!("Search for '{}' failed", query))?;
            print_tool_output(&settings, output)
        }
        Command::Queue => show_queue(&settings).await,
    }
}

fn cli_overrides(cli: &Cli) -> CliOverrides {
    let mut overrides = CliOverrides {
        log_level: cli.log_level.clone(),
        ..Default::default()
    };

    match &cli.command {
        Command::Run { source_dir, .. } => overrides.source_dir = source_dir.clone(),
        Command::Fetch { tool, .. } | Command::Search { tool, .. } => {
            overrides.tool_path = tool.tool_path.clone();
            overrides.tool_timeout_ms = tool.timeout_ms;
            overrides.tool_retries = tool.retries;
        }
        Command::Queue => {}
    }

    overrides
}

fn retry_queue(settings: &IngestSettings) -> RetryQueue {
    RetryQueue::from_paths(&settings.queue_path, &settings.archive_path)
        .with_threshold(settings.retry_threshold)
}

async fn run_batch(settings: &IngestSettings, json: bool) -> Result<()> {
    info!("Database: {}", settings.database_path.display());
    info!("Source documents: {}", settings.source_dir.display());

    let pool = db::init_database_pool(&settings.database_path)
        .await
        .context("Failed to open song database")?;
    let store = Arc::new(SqliteRecordStore::new(pool));

    let orchestrator =
        IngestionOrchestrator::new(store, retry_queue(settings), settings.orchestrator_settings())
            .with_scanner(settings.document_scanner())
            .with_extractor(settings.song_extractor());

    let summary = orchestrator.run_batch().await.context("Batch run aborted")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary);
    }

    Ok(())
}

fn tool_invoker(settings: &IngestSettings) -> Result<ToolInvoker> {
    let invoker = ToolInvoker::resolve(settings.tool.path.as_deref(), DEFAULT_TOOL_NAME)
        .context("External tool unavailable")?
        .with_retry_delay(settings.tool.retry_delay);

    info!("External tool: {}", invoker.binary_path().display());
    Ok(invoker)
}

fn print_tool_output(settings: &IngestSettings, output: ToolOutput) -> Result<()> {
    match output {
        ToolOutput::Exported(song) => println!("{}", serde_json::to_string_pretty(&song)?),
        ToolOutput::SearchResults(hits) => {
            for hit in &hits {
                println!("{}\t{} - {}", hit.id, hit.artist, hit.title);
            }
            println!("{} result(s)", hits.len());
        }
        ToolOutput::Unparsed {
            operation,
            raw,
            reason,
        } => {
            // Keep the payload for reprocessing
            let file_name = format!(
                "{}-{}.txt",
                operation.as_str(),
                chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ")
            );
            let path = settings.raw_dir.join(file_name);
            songbook_common::fs_utils::write_atomic(&path, raw.as_bytes())
                .with_context(|| format!("Failed to save raw output to {}", path.display()))?;

            eprintln!("Tool output could not be parsed ({})", reason);
            eprintln!("Raw output saved to {}", path.display());
        }
    }

    Ok(())
}

async fn show_queue(settings: &IngestSettings) -> Result<()> {
    let queue = retry_queue(settings);

    let pending = queue.drain().await.context("Failed to read retry queue")?;
    let dead = queue
        .dead_letters()
        .await
        .context("Failed to read dead-letter archive")?;

    println!("Pending ({}) - {}", pending.len(), settings.queue_path.display());
    for entry in &pending {
        println!(
            "  {} retries={} {}",
            entry.key(),
            entry.retry_count,
            entry.last_error.as_deref().unwrap_or("")
        );
    }

    println!("Dead-lettered ({}) - {}", dead.len(), settings.archive_path.display());
    for entry in &dead {
        println!(
            "  {} retries={} last_attempt={}",
            entry.key(),
            entry.final_retry_count,
            entry.last_attempt_date
        );
    }

    Ok(())
}
