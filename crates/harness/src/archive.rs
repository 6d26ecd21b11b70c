//! Submission archive extraction
//!
//! Problems with the archive itself (corrupt data, unsupported features, an
//! unreadable file) are an ordinary submission outcome and come back as
//! `ExtractOutcome::Failed`. Problems with the destination filesystem are not
//! the submission's fault and are returned as errors.

use irgrade_core::error::{Error, Result};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

/// Result of trying to unpack one archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    Extracted,
    Failed(ExtractFailure),
}

impl ExtractOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Extracted)
    }
}

/// Why an archive could not be unpacked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractFailure {
    /// The archive file could not be opened
    Unreadable(String),
    /// Not a valid archive, or an entry is malformed
    Corrupt(String),
    /// Valid archive using a feature we cannot read (compression method, encryption)
    Unsupported(String),
    /// I/O failure while reading or unpacking entries
    Io(String),
}

impl fmt::Display for ExtractFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable(msg) => write!(f, "unreadable archive: {msg}"),
            Self::Corrupt(msg) => write!(f, "corrupt archive: {msg}"),
            Self::Unsupported(msg) => write!(f, "unsupported archive: {msg}"),
            Self::Io(msg) => write!(f, "I/O error during extraction: {msg}"),
        }
    }
}

/// Unpack `archive` into `destination`
pub fn extract_archive(archive: &Path, destination: &Path) -> Result<ExtractOutcome> {
    let file = match File::open(archive) {
        Ok(file) => file,
        Err(e) => {
            return Ok(ExtractOutcome::Failed(ExtractFailure::Unreadable(
                e.to_string(),
            )))
        }
    };

    let mut zip = match ZipArchive::new(BufReader::new(file)) {
        Ok(zip) => zip,
        Err(e) => return classify(archive, e).map(ExtractOutcome::Failed),
    };

    debug!(
        archive = %archive.display(),
        entries = zip.len(),
        "Extracting archive"
    );

    match zip.extract(destination) {
        Ok(()) => Ok(ExtractOutcome::Extracted),
        Err(e) => classify(archive, e).map(ExtractOutcome::Failed),
    }
}

/// Sort a zip error into a submission failure or an environment error
fn classify(archive: &Path, err: ZipError) -> Result<ExtractFailure> {
    match err {
        ZipError::Io(io) if is_environment_failure(io.kind()) => {
            Err(Error::archive(archive, format!("destination unusable: {io}")))
        }
        ZipError::Io(io) => Ok(ExtractFailure::Io(io.to_string())),
        ZipError::InvalidArchive(msg) => Ok(ExtractFailure::Corrupt(msg.to_string())),
        ZipError::UnsupportedArchive(msg) => Ok(ExtractFailure::Unsupported(msg.to_string())),
        other => Ok(ExtractFailure::Corrupt(other.to_string())),
    }
}

fn is_environment_failure(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::StorageFull | ErrorKind::QuotaExceeded | ErrorKind::ReadOnlyFilesystem
    )
}

/// The extracted tree did not contain the expected top-level directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingRoot {
    pub expected: PathBuf,
    /// Top-level entries that were present instead
    pub found: Vec<String>,
}

impl fmt::Display for MissingRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected submission directory {} (found: [{}])",
            self.expected.display(),
            self.found.join(", ")
        )
    }
}

/// Locate `<destination>/<identifier>`, the directory the scripts run from
pub fn submission_root(
    destination: &Path,
    identifier: &str,
) -> std::result::Result<PathBuf, MissingRoot> {
    let expected = destination.join(identifier);
    if expected.is_dir() {
        return Ok(expected);
    }

    let mut found: Vec<String> = std::fs::read_dir(destination)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    found.sort();

    Err(MissingRoot { expected, found })
}
