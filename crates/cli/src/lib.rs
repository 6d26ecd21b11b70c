//! Library interface for the irgrade CLI
//!
//! The argument parser and the batch entry point live here so integration
//! tests can drive them without spawning the binary.

use anyhow::{Context, Result};
use clap::Parser;
use irgrade_core::config::HarnessConfig;
use irgrade_core::record::BatchReport;
use irgrade_harness::BatchDriver;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "irgrade")]
#[command(about = "Grade a batch of search engine submissions")]
#[command(version)]
pub struct Cli {
    /// Directory holding one archive per submission
    #[arg(value_name = "SUBMISSIONS_DIR")]
    pub submissions_dir: PathBuf,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Load, anchor and validate the harness configuration
///
/// Relative paths are resolved against `base`, since the submission scripts
/// run from inside their extracted directory.
pub fn load_config(config_path: Option<&Path>, base: &Path) -> Result<HarnessConfig> {
    let config = HarnessConfig::load(config_path)
        .context("Failed to load configuration")?
        .resolve_paths(base);
    config.validate().context("Invalid configuration")?;
    debug!("Loaded configuration: {config:?}");
    Ok(config)
}

/// Grade every submission in `submissions_dir`
pub async fn run(
    submissions_dir: &Path,
    config: &HarnessConfig,
    show_progress: bool,
) -> Result<BatchReport> {
    if !submissions_dir.is_dir() {
        anyhow::bail!(
            "Submissions directory does not exist: {}",
            submissions_dir.display()
        );
    }

    BatchDriver::new(config)
        .with_progress(show_progress)
        .run_batch(submissions_dir)
        .await
        .context("Batch run failed")
}
