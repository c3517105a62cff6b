//! Site-Harvest main entry point
//!
//! This is the command-line interface for the Site-Harvest archiver.

use clap::Parser;
use site_harvest::config::{load_config_with_hash, Config};
use site_harvest::crawler::{HarvestJob, Scheduler};
use site_harvest::extract::{extract_upload, ExtractionPipeline};
use site_harvest::output::{load_statistics, print_statistics, print_summary, write_document_index};
use site_harvest::state::CrawlState;
use site_harvest::storage::{OutputLayout, SqliteStorage, Storage};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Site-Harvest: a bounded-domain archiver
///
/// Site-Harvest crawls one site breadth-first from a seed page, mirrors its
/// HTML, downloads linked PDFs and images, extracts their text, and
/// recrawls on its own once the archive has gone stale.
#[derive(Parser, Debug)]
#[command(name = "site-harvest")]
#[command(version)]
#[command(about = "A bounded-domain site archiver", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Keep running, recrawling whenever the archive goes stale
    #[arg(long, conflicts_with_all = ["extract", "stats", "documents", "dry_run"])]
    forever: bool,

    /// Crawl now even if the archive is still fresh
    #[arg(long, conflicts_with_all = ["extract", "stats", "documents", "dry_run"])]
    force: bool,

    /// Extract text from a local file instead of crawling
    #[arg(long, value_name = "FILE", conflicts_with_all = ["stats", "documents", "dry_run"])]
    extract: Option<PathBuf>,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["documents", "dry_run"])]
    stats: bool,

    /// Write the document index (documents.md) and exit
    #[arg(long, conflicts_with = "dry_run")]
    documents: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.documents {
        handle_documents(&config)?;
    } else if let Some(file) = &cli.extract {
        handle_extract(&config, file).await?;
    } else {
        handle_crawl(config, config_hash, cli.force, cli.forever).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_harvest=info,warn"),
            1 => EnvFilter::new("site_harvest=debug,info"),
            2 => EnvFilter::new("site_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Site-Harvest Dry Run ===\n");

    println!("Crawl:");
    println!("  Seed: {}", config.crawl.seed);
    println!("  Boundary host: {}", config.crawl.boundary_host);
    if config.crawl.allowed_paths.is_empty() {
        println!("  Allowed paths: (whole host)");
    } else {
        println!("  Allowed paths: {}", config.crawl.allowed_paths.join(", "));
    }
    println!("  Concurrent fetches: {}", config.crawl.max_concurrent_fetches);
    println!("  Request delay: {}ms", config.crawl.request_delay_ms);
    println!("  Request timeout: {}s", config.crawl.request_timeout_secs);
    println!("  User agent: {}", config.crawl.user_agent);

    println!("\nOutput:");
    println!("  Root: {}", config.output.root.display());
    println!("  Database: {}", config.output.database_path().display());

    println!("\nSchedule:");
    println!("  Recrawl interval: {} days", config.schedule.interval_days);
    println!("  Poll interval: {}s", config.schedule.poll_interval_secs);

    let pipeline = ExtractionPipeline::detect(config.extraction.tool_timeout());
    println!("\nExtraction:");
    println!("  Workers: {}", config.extraction.max_workers);
    println!("  Native text (pdftotext): {}", available(pipeline.native_available()));
    println!("  OCR (pdftoppm + tesseract): {}", available(pipeline.ocr_available()));

    let db_path = config.output.database_path();
    if db_path.exists() {
        let storage = SqliteStorage::new(&db_path)?;
        let state = CrawlState::load(&storage, config.schedule.interval_days)?;
        let now = chrono::Utc::now();
        match (state.last_crawl, state.is_due(now)) {
            (None, _) => println!("\n✓ No previous crawl; a crawl would start now"),
            (Some(last), true) => println!(
                "\n✓ Last crawl {} is stale; a crawl would start now",
                last.to_rfc3339()
            ),
            (Some(last), false) => println!(
                "\n✓ Last crawl {} is fresh; next crawl due {}",
                last.to_rfc3339(),
                state
                    .next_due(now)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default()
            ),
        }
    } else {
        println!("\n✓ No database yet; a crawl would start now");
    }

    println!("✓ Configuration is valid");
    Ok(())
}

fn available(flag: bool) -> &'static str {
    if flag {
        "available"
    } else {
        "not found"
    }
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let db_path = config.output.database_path();
    println!("Database: {}\n", db_path.display());

    let storage = SqliteStorage::new(&db_path)?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --documents mode: writes the document index
fn handle_documents(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let storage = SqliteStorage::new(&config.output.database_path())?;
    let layout = OutputLayout::new(&config.output.root);

    let documents = storage.list_documents()?;
    let path = write_document_index(&layout, &documents)?;
    println!("✓ Indexed {} documents in {}", documents.len(), path.display());

    Ok(())
}

/// Handles the --extract mode: runs the pipeline over one local file
async fn handle_extract(config: &Config, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut storage = SqliteStorage::new(&config.output.database_path())?;
    let layout = OutputLayout::new(&config.output.root);
    layout.ensure_dirs()?;
    let pipeline = ExtractionPipeline::detect(config.extraction.tool_timeout());

    let record = extract_upload(&layout, &mut storage, &pipeline, file).await?;
    match record.text() {
        Some(text) => {
            println!("Strategy: {}\n", record.strategy);
            println!("{}", text);
        }
        None => println!("No text could be extracted from {}", file.display()),
    }

    Ok(())
}

/// Handles the crawl modes: once (default), forced, or forever
async fn handle_crawl(
    config: Config,
    config_hash: String,
    force: bool,
    forever: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, shutting down");
            on_signal.cancel();
        }
    });

    let store = SqliteStorage::new(&config.output.database_path())?;
    let mut scheduler = Scheduler::from_config(store, &config.schedule);
    let mut job = HarvestJob::new(config, config_hash);

    if forever {
        if force {
            if let Some(summary) = scheduler.run_once(&mut job, true, &cancel).await? {
                print_summary(&summary);
            }
        }
        scheduler.run_forever(&mut job, cancel).await?;
        return Ok(());
    }

    match scheduler.run_once(&mut job, force, &cancel).await {
        Ok(Some(summary)) => {
            print_summary(&summary);
            Ok(())
        }
        Ok(None) => {
            println!("Archive is up to date; use --force to crawl anyway");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
