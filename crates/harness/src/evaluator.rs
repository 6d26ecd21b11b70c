//! Per-submission evaluation state machine
//!
//! A submission moves strictly forward through
//! `Created → Unzipped → Indexed → Measured → Searched → Done`. Any failed or
//! timed-out step jumps straight to `Done`, leaving every later field of the
//! record unset. Only environment errors are returned as `Err`.

use crate::archive::{self, ExtractOutcome};
use crate::runner::{CommandSpec, Outcome, ProcessRunner};
use crate::size_probe;
use crate::timing::timed;
use irgrade_core::config::HarnessConfig;
use irgrade_core::error::{Error, Result};
use irgrade_core::record::SubmissionRecord;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where a submission is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EvaluationState {
    Created,
    Unzipped,
    Indexed,
    Measured,
    Searched,
    Done,
}

/// Drives one submission archive through the pipeline
pub struct SubmissionEvaluator<'a> {
    config: &'a HarnessConfig,
    runner: ProcessRunner,
}

/// Mutable state of a single evaluation
struct Evaluation<'p> {
    archive: &'p Path,
    record: SubmissionRecord,
    root: Option<PathBuf>,
}

impl<'a> SubmissionEvaluator<'a> {
    pub fn new(config: &'a HarnessConfig) -> Self {
        Self {
            config,
            runner: ProcessRunner::new(config.limits.capture_limit_bytes),
        }
    }

    /// Evaluate `archive` to completion and return its record
    ///
    /// The workspace must have been reset beforehand.
    pub async fn evaluate(&self, archive: &Path) -> Result<SubmissionRecord> {
        let mut evaluation = Evaluation {
            archive,
            record: SubmissionRecord::for_archive(archive),
            root: None,
        };

        let mut state = EvaluationState::Created;
        while state != EvaluationState::Done {
            let next = self.advance(state, &mut evaluation).await?;
            debug!(
                identifier = %evaluation.record.identifier,
                from = ?state,
                to = ?next,
                "State transition"
            );
            state = next;
        }

        Ok(evaluation.record)
    }

    async fn advance(
        &self,
        state: EvaluationState,
        evaluation: &mut Evaluation<'_>,
    ) -> Result<EvaluationState> {
        match state {
            EvaluationState::Created => self.unzip(evaluation).await,
            EvaluationState::Unzipped => self.index(evaluation).await,
            EvaluationState::Indexed => self.measure(evaluation).await,
            EvaluationState::Measured => self.search(evaluation).await,
            EvaluationState::Searched | EvaluationState::Done => Ok(EvaluationState::Done),
        }
    }

    async fn unzip(&self, evaluation: &mut Evaluation<'_>) -> Result<EvaluationState> {
        let archive = evaluation.archive.to_path_buf();
        let destination = self.config.workspace.temp_dir.clone();
        let outcome =
            tokio::task::spawn_blocking(move || archive::extract_archive(&archive, &destination))
                .await
                .map_err(|e| Error::Other(anyhow::anyhow!("Extraction task failed: {e}")))??;

        let record = &mut evaluation.record;
        match outcome {
            ExtractOutcome::Extracted => {
                record.unzip_success = Some(true);
                Ok(EvaluationState::Unzipped)
            }
            ExtractOutcome::Failed(reason) => {
                info!(identifier = %record.identifier, "Unzip failed: {reason}");
                record.unzip_success = Some(false);
                Ok(EvaluationState::Done)
            }
        }
    }

    async fn index(&self, evaluation: &mut Evaluation<'_>) -> Result<EvaluationState> {
        let record = &mut evaluation.record;
        let root = match archive::submission_root(&self.config.workspace.temp_dir, &record.identifier)
        {
            Ok(root) => root,
            Err(missing) => {
                warn!(
                    identifier = %record.identifier,
                    "Cannot run index step: {missing}"
                );
                record.index_timeout = Some(false);
                record.index_success = Some(false);
                return Ok(EvaluationState::Done);
            }
        };

        let command = CommandSpec::new(&self.config.commands.interpreter)
            .arg(&self.config.commands.index_script)
            .arg(&self.config.inputs.dump_path)
            .arg(&self.config.workspace.index_dir);

        let result = self
            .runner
            .run_timed(&command, &root, self.config.limits.index_timeout())
            .await;
        if let Ok((_, elapsed)) = &result {
            record.index_time = elapsed.as_secs_f64();
        }
        evaluation.root = Some(root);

        let (timed_out, success) =
            step_result(&record.identifier, "index", result.map(|(outcome, _)| outcome));
        record.index_timeout = Some(timed_out);
        if timed_out {
            info!(
                identifier = %record.identifier,
                "Index step timed out after {:.1}s",
                record.index_time
            );
            return Ok(EvaluationState::Done);
        }
        record.index_success = Some(success);

        if success {
            Ok(EvaluationState::Indexed)
        } else {
            Ok(EvaluationState::Done)
        }
    }

    async fn measure(&self, evaluation: &mut Evaluation<'_>) -> Result<EvaluationState> {
        let index_dir = self.config.workspace.index_dir.clone();
        let (size, elapsed) = tokio::task::spawn_blocking(move || timed(|| size_probe::measure(&index_dir)))
            .await
            .map_err(|e| Error::Other(anyhow::anyhow!("Size probe task failed: {e}")))?;

        let record = &mut evaluation.record;
        record.index_size = size;
        debug!(
            identifier = %record.identifier,
            index_size = size,
            "Measured index in {elapsed:?}"
        );
        Ok(EvaluationState::Measured)
    }

    async fn search(&self, evaluation: &mut Evaluation<'_>) -> Result<EvaluationState> {
        let record = &mut evaluation.record;
        let root = evaluation
            .root
            .as_deref()
            .ok_or_else(|| Error::process("Search requested before the submission root was resolved"))?;

        let output_file = self.config.workspace.output_file(&record.identifier);
        let command = CommandSpec::new(&self.config.commands.interpreter)
            .arg(&self.config.commands.search_script)
            .arg(&self.config.workspace.index_dir)
            .arg(&self.config.inputs.query_file)
            .arg(&output_file);

        let result = self
            .runner
            .run_timed(&command, root, self.config.limits.search_timeout())
            .await;
        let elapsed = result
            .as_ref()
            .map(|(_, elapsed)| *elapsed)
            .unwrap_or_default();

        let (timed_out, success) =
            step_result(&record.identifier, "search", result.map(|(outcome, _)| outcome));
        record.search_timeout = Some(timed_out);
        if !timed_out {
            record.search_success = Some(success);
        }
        debug!(
            identifier = %record.identifier,
            timed_out,
            success,
            "Search step finished in {}",
            format_secs(elapsed)
        );
        Ok(EvaluationState::Searched)
    }
}

/// Map a runner result to `(timed_out, success)`
///
/// A process that could not be started is a failed step for this submission,
/// not a harness failure.
fn step_result(identifier: &str, step: &str, result: Result<Outcome>) -> (bool, bool) {
    match result {
        Ok(Outcome::TimedOut) => (true, false),
        Ok(Outcome::Completed(code)) => {
            if code != 0 {
                debug!(identifier, step, code, "Step exited with nonzero status");
            }
            (false, code == 0)
        }
        Err(e) => {
            warn!(identifier, step, "Step could not be run: {e}");
            (false, false)
        }
    }
}

fn format_secs(elapsed: Duration) -> String {
    format!("{:.2}s", elapsed.as_secs_f64())
}
