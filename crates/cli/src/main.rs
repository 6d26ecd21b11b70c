//! irgrade CLI - batch grading for search engine submissions
//!
//! This binary evaluates every archive in a submissions directory and writes
//! one JSON line per submission to the configured results file.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use anyhow::{Context, Result};
use clap::Parser;
use irgrade::{load_config, run, Cli};
use std::env;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose)?;

    let current_dir = env::current_dir().context("Failed to get current directory")?;
    let config = load_config(cli.config.as_deref(), &current_dir)?;

    let report = run(&cli.submissions_dir, &config, true).await?;
    let summary = report.summary();
    info!("Graded {}", summary);
    println!("{summary}");

    Ok(())
}

/// Initialize logging system
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "irgrade_harness={level},irgrade_core={level},{}={level}",
            env!("CARGO_CRATE_NAME")
        ))
        .init();

    Ok(())
}
