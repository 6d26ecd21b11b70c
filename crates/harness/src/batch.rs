//! Batch driver: one record per submission archive
//!
//! Submissions are evaluated sequentially. The workspace is reset before the
//! first submission (including the output directory) and again after each
//! one, and torn down when the batch ends. The report is written once, after
//! the last submission.

use crate::evaluator::SubmissionEvaluator;
use crate::workspace::Workspace;
use indicatif::{ProgressBar, ProgressStyle};
use irgrade_core::config::HarnessConfig;
use irgrade_core::error::{Error, Result, ResultExt};
use irgrade_core::record::BatchReport;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Runs every archive in a directory through the evaluator
pub struct BatchDriver<'a> {
    config: &'a HarnessConfig,
    show_progress: bool,
}

impl<'a> BatchDriver<'a> {
    pub fn new(config: &'a HarnessConfig) -> Self {
        Self {
            config,
            show_progress: true,
        }
    }

    /// Enable or disable the terminal progress bar
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Evaluate every archive in `submissions_dir` and persist the report
    ///
    /// The configuration must pass [`HarnessConfig::validate`]; in particular
    /// every path handed to a script must already be absolute.
    pub async fn run_batch(&self, submissions_dir: &Path) -> Result<BatchReport> {
        self.config
            .validate()
            .context("Refusing to run batch with invalid configuration")?;
        let archives = list_archives(submissions_dir)?;
        info!(
            "Found {} submissions in {}",
            archives.len(),
            submissions_dir.display()
        );

        let workspace = Workspace::new(&self.config.workspace);
        let evaluator = SubmissionEvaluator::new(self.config);
        let mut report = BatchReport::new();

        workspace
            .reset(true)
            .context("Failed to prepare workspace before the batch")?;

        let pb = self.progress_bar(archives.len());
        for archive in &archives {
            let name = archive_name(archive);
            pb.set_message(name.clone());

            let record = evaluator
                .evaluate(archive)
                .await
                .map_err(|e| abort(&pb, &name, "evaluating", e))?;
            info!(
                identifier = %record.identifier,
                unzip = ?record.unzip_success,
                index = ?record.index_success,
                search = ?record.search_success,
                "Submission evaluated"
            );
            report.push(record);

            workspace
                .reset(false)
                .map_err(|e| abort(&pb, &name, "cleaning up after", e))?;
            pb.inc(1);
        }
        pb.finish_with_message("done");

        workspace
            .final_teardown()
            .context("Failed to tear down workspace after the batch")?;

        report.write_jsonl(&self.config.workspace.results_file)?;
        info!(
            "{} (report written to {})",
            report.summary(),
            self.config.workspace.results_file.display()
        );

        Ok(report)
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .map_err(|e| error!("Failed to set progress bar style: {}", e))
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        pb
    }
}

/// Regular, non-hidden files in `dir`, sorted by name
///
/// Every such file is treated as a submission; anything that is not a valid
/// archive gets an `unzip_success = false` record.
pub fn list_archives(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .context(format!("Failed to list submissions in {}", dir.display()))?;

    let mut archives = Vec::new();
    for entry in entries {
        let entry = entry.context(format!("Failed to list submissions in {}", dir.display()))?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if is_file && !hidden {
            archives.push(entry.path());
        }
    }
    archives.sort();
    Ok(archives)
}

fn archive_name(archive: &Path) -> String {
    archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Stop the batch, naming the submission that was in flight
fn abort(pb: &ProgressBar, name: &str, activity: &str, err: Error) -> Error {
    pb.abandon_with_message(format!("aborted at {name}"));
    Error::with_context(format!("Batch aborted while {activity} submission {name}"), err)
}
