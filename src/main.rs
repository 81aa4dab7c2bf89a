//! # Railwatch — PNR status watcher
//!
//! Runs one reconciliation pass over the configured reservations and exits.
//! Meant to be triggered by cron or a CI schedule.
//!
//! Usage:
//!   railwatch                              # ~/.railwatch/config.toml + env
//!   railwatch --config watch.toml          # Explicit config file
//!   railwatch --backend sqlite             # Keyed SQLite store instead of files
//!   railwatch --dry-run                    # Fetch and compare only
//!
//! Exit codes: 0 batch completed, 1 configuration error, 2 some entity
//! failed to fetch or persist.

use anyhow::{Context, Result};
use clap::Parser;
use railwatch_core::config::{DetectionMode, StoreBackend, WatchConfig};
use railwatch_core::traits::StateStore;
use railwatch_scheduler::{FileStateStore, ReconciliationLoop, SqliteStateStore};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "railwatch",
    version,
    about = "🚆 Railwatch — notify when a reservation's status changes"
)]
struct Cli {
    /// Config file (default: ~/.railwatch/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for per-reservation state files
    #[arg(long)]
    state_dir: Option<String>,

    /// State backend: file or sqlite
    #[arg(long)]
    backend: Option<String>,

    /// Change detection: containment or strict
    #[arg(long)]
    mode: Option<String>,

    /// Reservations checked at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Fetch and compare only; send nothing, save nothing
    #[arg(long)]
    dry_run: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> Result<WatchConfig> {
    let mut config = match &cli.config {
        Some(path) => WatchConfig::load_from(path)?,
        None => WatchConfig::load()?,
    };
    config.apply_env();

    if let Some(dir) = &cli.state_dir {
        config.store.dir = dir.clone();
    }
    if let Some(backend) = &cli.backend {
        config.store.backend = backend.parse::<StoreBackend>()?;
    }
    if let Some(mode) = &cli.mode {
        config.detection.mode = mode.parse::<DetectionMode>()?;
    }
    if let Some(n) = cli.concurrency {
        config.concurrency = n;
    }
    Ok(config)
}

fn open_store(config: &WatchConfig) -> Result<Box<dyn StateStore>> {
    let store: Box<dyn StateStore> = match config.store.backend {
        StoreBackend::File => {
            let dir = config.store.resolved_dir();
            tracing::info!("💾 State files in {}", dir.display());
            Box::new(FileStateStore::new(&dir).context("opening state directory")?)
        }
        StoreBackend::Sqlite => {
            let path = config.store.resolved_db_path();
            tracing::info!("💾 State database at {}", path.display());
            Box::new(SqliteStateStore::open(&path).context("opening state database")?)
        }
    };
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "railwatch=debug,railwatch_core=debug,railwatch_providers=debug,railwatch_scheduler=debug"
    } else {
        "railwatch=info,railwatch_core=info,railwatch_providers=info,railwatch_scheduler=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = load_config(&cli)?;
    let batch = config.validate().context("invalid configuration")?;
    let store = open_store(&config)?;
    let fetcher = railwatch_providers::create_fetcher(&config);

    let reconciler =
        ReconciliationLoop::from_config(&config, fetcher, store).with_dry_run(cli.dry_run);
    let report = reconciler.run(&batch).await;
    report.log_summary();

    if report.has_hard_failures() {
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
