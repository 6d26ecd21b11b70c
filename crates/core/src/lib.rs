//! Core types for the irgrade submission grading harness
//!
//! This crate provides the foundational pieces shared by the harness and the
//! command-line entry point:
//!
//! - **Configuration**: explicit harness configuration loaded once at startup
//! - **Records**: the per-submission report record and the batch report
//! - **Error handling**: unified error types
//!

pub mod config;
pub mod error;
pub mod record;

// Re-export main types for convenience
pub use config::{CommandsConfig, HarnessConfig, InputsConfig, LimitsConfig, WorkspaceConfig};
pub use error::{Error, Result, ResultExt};
pub use record::{BatchReport, BatchSummary, SubmissionRecord};
