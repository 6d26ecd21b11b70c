//! Per-submission report records and the batch report
//!
//! A `SubmissionRecord` distinguishes "not attempted" (`None`, serialized as
//! `null`) from "attempted and failed" (`Some(false)`). Fields downstream of a
//! failed step are never filled in.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::Path;

/// Outcome of evaluating one submission archive
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    /// Archive file name up to its first `.`
    pub identifier: String,
    pub unzip_success: Option<bool>,
    pub index_timeout: Option<bool>,
    pub index_success: Option<bool>,
    /// Wall-clock seconds spent in the index step, including a timed-out attempt
    #[serde(default)]
    pub index_time: f64,
    /// Bytes of regular files under the index directory after a successful index step
    #[serde(default)]
    pub index_size: u64,
    pub search_timeout: Option<bool>,
    pub search_success: Option<bool>,
}

impl SubmissionRecord {
    /// Create an empty record for a submission
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Default::default()
        }
    }

    /// Create an empty record keyed by the archive's file name
    pub fn for_archive(archive: &Path) -> Self {
        Self::new(identifier_from_path(archive))
    }

    /// True when both external steps ran to a zero exit
    pub fn fully_succeeded(&self) -> bool {
        self.unzip_success == Some(true)
            && self.index_success == Some(true)
            && self.search_success == Some(true)
    }
}

/// Derive a submission identifier from an archive path
///
/// `2019101001.zip` becomes `2019101001`; `team.v2.zip` becomes `team`.
pub fn identifier_from_path(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.split('.').next() {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => name,
    }
}

/// All records produced by one batch run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    records: Vec<SubmissionRecord>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished record
    pub fn push(&mut self, record: SubmissionRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[SubmissionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize as JSON Lines, one record per line
    pub fn to_jsonl(&self) -> Result<String> {
        let mut out = String::new();
        for record in &self.records {
            let line = serde_json::to_string(record).map_err(|e| {
                Error::report(format!(
                    "Failed to serialize record for {}: {e}",
                    record.identifier
                ))
            })?;
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }

    /// Parse a JSON Lines report
    pub fn from_jsonl(content: &str) -> Result<Self> {
        let records = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line)
                    .map_err(|e| Error::report(format!("Invalid record on line {}: {e}", i + 1)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { records })
    }

    /// Write the report to `path`, replacing any previous report
    pub fn write_jsonl(&self, path: &Path) -> Result<()> {
        let content = self.to_jsonl()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::report(format!(
                    "Failed to create report directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let mut file = std::fs::File::create(path).map_err(|e| {
            Error::report(format!("Failed to create report {}: {e}", path.display()))
        })?;
        file.write_all(content.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| Error::report(format!("Failed to write report {}: {e}", path.display())))
    }

    /// Aggregate counts for the operator
    pub fn summary(&self) -> BatchSummary {
        let count = |f: fn(&SubmissionRecord) -> bool| self.records.iter().filter(|r| f(r)).count();
        BatchSummary {
            total: self.records.len(),
            unzipped: count(|r| r.unzip_success == Some(true)),
            indexed: count(|r| r.index_success == Some(true)),
            index_timeouts: count(|r| r.index_timeout == Some(true)),
            searched: count(|r| r.search_success == Some(true)),
            search_timeouts: count(|r| r.search_timeout == Some(true)),
        }
    }
}

/// Counts of how far submissions got through the pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub unzipped: usize,
    pub indexed: usize,
    pub index_timeouts: usize,
    pub searched: usize,
    pub search_timeouts: usize,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} submissions: {} unzipped, {} indexed ({} timed out), {} searched ({} timed out)",
            self.total,
            self.unzipped,
            self.indexed,
            self.index_timeouts,
            self.searched,
            self.search_timeouts
        )
    }
}
