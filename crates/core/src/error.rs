use std::path::Path;
use thiserror::Error;

/// Result type for irgrade operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for irgrade operations
///
/// Submission-level failures (bad archives, timeouts, nonzero exits) are not
/// errors; they end up as fields of a `SubmissionRecord`. This type covers the
/// environment problems that stop the harness itself.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Archive extraction hit an environment problem
    #[error("Archive error in {archive}: {message}")]
    Archive { archive: String, message: String },

    /// Process management errors
    #[error("Process management error: {0}")]
    Process(String),

    /// Workspace directory lifecycle errors
    #[error("Workspace error at {path}: {message}")]
    Workspace { path: String, message: String },

    /// Batch report errors
    #[error("Report error: {0}")]
    Report(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Creates a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an archive error
    pub fn archive(archive: &Path, message: impl Into<String>) -> Self {
        Self::Archive {
            archive: archive.display().to_string(),
            message: message.into(),
        }
    }

    /// Creates a process management error
    pub fn process(msg: impl Into<String>) -> Self {
        Self::Process(msg.into())
    }

    /// Creates a workspace error
    pub fn workspace(path: &Path, message: impl Into<String>) -> Self {
        Self::Workspace {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    /// Creates a report error
    pub fn report(msg: impl Into<String>) -> Self {
        Self::Report(msg.into())
    }

    /// Adds context to any error
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::with_context(context, e))
    }
}
