//! Snapshotter CLI
//!
//! Runs the scheduler as a long-lived service, or performs one-off runs,
//! cleanups and history queries.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use snapshotter::{
    Snapshotter,
    config::{load_all, load_config},
    error::{AppError, Result},
    models::{Config, RunResult},
};

/// Snapshotter - scheduled HTTP endpoint snapshots
#[derive(Parser, Debug)]
#[command(
    name = "snapshotter",
    version,
    about = "Polls HTTP endpoints on a schedule and keeps timestamped snapshots"
)]
struct Cli {
    /// Path to the service configuration file
    #[arg(short, long, default_value = "snapshotter.toml", global = true)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the scheduler and run until interrupted
    Serve {
        /// Re-read endpoint definitions and reschedule every N seconds
        #[arg(long)]
        reload_secs: Option<u64>,
    },

    /// Run jobs immediately
    Run {
        /// Endpoint id to run
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        id: Option<String>,

        /// Run every endpoint
        #[arg(long)]
        all: bool,
    },

    /// Delete snapshots older than each endpoint's retention window
    Cleanup,

    /// Show run history for an endpoint
    Logs {
        id: String,

        /// Maximum number of records
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },

    /// List snapshot files on disk for an endpoint
    Files { id: String },

    /// Validate configuration and endpoint definitions
    Validate,
}

/// Initialize logging from the verbosity flag and configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn report(name: &str, result: &RunResult) {
    match (&result.error, &result.log.file_path) {
        (Some(error), _) => log::error!("✗ {}: {}", name, error),
        (None, Some(path)) => log::info!(
            "✓ {}: {}{}",
            name,
            path.display(),
            if result.log.diff_detected {
                " (changed)"
            } else {
                ""
            }
        ),
        (None, None) => log::info!("✓ {}", name),
    }
}

async fn serve(app: &Snapshotter, reload_secs: Option<u64>) -> Result<()> {
    let scheduler = app.scheduler();
    scheduler.start().await?;

    let reload = async {
        match reload_secs.filter(|secs| *secs > 0) {
            Some(secs) => {
                let mut interval = tokio::time::interval(Duration::from_secs(secs));
                interval.tick().await;
                loop {
                    interval.tick().await;
                    log::debug!("Reloading endpoint definitions");
                    if let Err(e) = scheduler.start().await {
                        log::error!("Reschedule failed: {}", e);
                    }
                }
            }
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        signal = tokio::signal::ctrl_c() => signal?,
        _ = reload => {}
    }

    log::info!("Shutdown requested, waiting for running jobs...");
    scheduler.stop().await;
    scheduler.wait_for_jobs().await;
    Ok(())
}

async fn open(config: Config) -> Result<Snapshotter> {
    config.validate()?;
    Snapshotter::open(config).await
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            init_logging(cli.verbose, &Config::default().logging.level);
            log::error!("Failed to load {}: {}", cli.config.display(), e);
            return Err(e);
        }
    };
    init_logging(cli.verbose, &config.logging.level);

    match cli.command {
        Command::Serve { reload_secs } => serve(&open(config).await?, reload_secs).await?,

        Command::Run { id: Some(id), .. } => {
            let app = open(config).await?;
            let endpoint = app.endpoint(&id).await?;
            let result = app.run_now(&id).await?;
            report(&endpoint.name, &result);
            if !result.ok {
                return Err(AppError::run(&endpoint.name, result.error.unwrap_or_default()));
            }
        }

        Command::Run { id: None, .. } => {
            let results = open(config).await?.run_all().await?;
            let failed = results.iter().filter(|(_, r)| !r.ok).count();
            for (endpoint, result) in &results {
                report(&endpoint.name, result);
            }
            log::info!("{} run(s), {} failed", results.len(), failed);
        }

        Command::Cleanup => {
            let summary = open(config).await?.cleanup().await;
            log::info!(
                "Cleanup: {} file(s) deleted, {} error(s)",
                summary.deleted,
                summary.errors
            );
        }

        Command::Logs { id, limit } => {
            let logs = open(config).await?.history(&id, Some(limit)).await?;
            println!("{}", serde_json::to_string_pretty(&logs)?);
        }

        Command::Files { id } => {
            let files = open(config).await?.files(&id).await?;
            println!("{}", serde_json::to_string_pretty(&files)?);
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            let (_, endpoints) = load_all(&cli.config).inspect_err(|e| {
                log::error!("Validation failed: {}", e);
            })?;
            log::info!("✓ Config OK");
            log::info!("✓ {} endpoint(s) OK", endpoints.len());
        }
    }

    Ok(())
}
