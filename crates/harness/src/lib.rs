//! Submission evaluation pipeline
//!
//! This crate grades a directory of submission archives, one at a time:
//! unzip → index → measure → search. Each external step runs as its own
//! process under a wall-clock limit, and every submission starts from a freshly
//! reset workspace so nothing leaks from one submission into the next.
//!
//! # Example
//!
//! ```no_run
//! use irgrade_core::HarnessConfig;
//! use irgrade_harness::BatchDriver;
//! use std::path::Path;
//!
//! # async fn example() -> irgrade_core::Result<()> {
//! // Paths handed to the scripts must be absolute
//! let config = HarnessConfig::default().resolve_paths(Path::new("/srv/grading"));
//! let report = BatchDriver::new(&config).run_batch(Path::new("submissions")).await?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod archive;
pub mod batch;
pub mod evaluator;
mod process_tree;
pub mod runner;
pub mod size_probe;
pub mod timing;
pub mod workspace;

// Re-export error types from core
pub use irgrade_core::error::{Error, Result};

pub use archive::{extract_archive, submission_root, ExtractFailure, ExtractOutcome};
pub use batch::{list_archives, BatchDriver};
pub use evaluator::{EvaluationState, SubmissionEvaluator};
pub use runner::{CommandSpec, Outcome, ProcessRunner};
pub use size_probe::measure;
pub use workspace::Workspace;
