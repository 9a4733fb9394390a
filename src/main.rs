//! harvest - importance-ranked, resumable subreddit collection.
//!
//! ```bash
//! # Default config discovery (./harvest.toml or built-in defaults)
//! harvest rust
//!
//! # Override the file from the command line
//! harvest rust --target 200 --categories hot,new --output-dir data
//!
//! # Continue an interrupted run past its checkpoint
//! harvest rust --rerank
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use collector::CollectionOrchestrator;
use harvest_core::{ErrorExt, HarvestConfig, ResumeMode};
use reddit_client::{RedditJsonClient, TokioSleeper};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Collect the most important posts of a subreddit with their comment trees.
#[derive(Parser)]
#[command(name = "harvest")]
#[command(version)]
pub struct Cli {
    /// Subreddit to collect, without the `r/` prefix.
    pub subreddit: String,

    /// Configuration file. Defaults to ./harvest.toml when present.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Directory for the output and checkpoint files.
    #[arg(long, short)]
    pub output_dir: Option<PathBuf>,

    /// Number of posts to collect in detail.
    #[arg(long, short)]
    pub target: Option<usize>,

    /// Listing categories to fetch, e.g. "hot,top".
    #[arg(long, value_delimiter = ',')]
    pub categories: Option<Vec<String>>,

    /// Re-rank listings on resume and skip posts the checkpoint already has.
    #[arg(long)]
    pub rerank: bool,

    /// Verbose output (show debug info).
    #[arg(long, short)]
    pub verbose: bool,
}

/// CLI exit codes.
#[repr(i32)]
enum ExitCode {
    Fatal = 1,
    Interrupted = 130,
}

const WORKSPACE_CRATES: [&str; 5] = [
    "harvest",
    "harvest_core",
    "reddit_client",
    "checkpoint_store",
    "collector",
];

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let default_directives = WORKSPACE_CRATES
        .iter()
        .map(|name| format!("{}={}", name, level))
        .collect::<Vec<_>>()
        .join(",");

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn build_config(cli: &Cli) -> Result<HarvestConfig> {
    let mut config = HarvestConfig::discover(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!(e.user_friendly_message()))
        .context("Failed to load configuration")?;

    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(target) = cli.target {
        config.collection.target_posts = target;
    }
    if let Some(categories) = &cli.categories {
        config.listing.categories = categories
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
    }
    if cli.rerank {
        config.collection.resume = ResumeMode::Rerank;
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!(e.user_friendly_message()))
        .context("Invalid configuration")?;
    Ok(config)
}

async fn run(cli: &Cli) -> Result<()> {
    let config = build_config(cli)?;
    let source = RedditJsonClient::new(&config.source, config.listing.time_filter.clone())
        .context("Failed to build HTTP client")?;
    let orchestrator = CollectionOrchestrator::new(Arc::new(source), config, Arc::new(TokioSleeper));

    info!("Starting harvest of r/{}", cli.subreddit);
    let summary = orchestrator
        .run(&cli.subreddit)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_friendly_message()))?;

    println!(
        "{} ({} posts)",
        summary.output_path.display(),
        summary.items.len()
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    tokio::select! {
        result = run(&cli) => {
            if let Err(e) = result {
                error!("Harvest of r/{} failed", cli.subreddit);
                eprintln!("Error: {:#}", e);
                std::process::exit(ExitCode::Fatal as i32);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted. Progress so far is kept in the checkpoint file");
            std::process::exit(ExitCode::Interrupted as i32);
        }
    }
}
