//! Workspace directory lifecycle
//!
//! The extraction root and the index directory belong to whichever submission
//! is being evaluated. `reset` before every submission is what keeps one
//! submission from seeing another's extracted files or index.

use irgrade_core::config::WorkspaceConfig;
use irgrade_core::error::{Error, Result};
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Owner of the harness's transient directories
#[derive(Debug, Clone, Copy)]
pub struct Workspace<'a> {
    config: &'a WorkspaceConfig,
}

impl<'a> Workspace<'a> {
    pub fn new(config: &'a WorkspaceConfig) -> Self {
        Self { config }
    }

    /// Extraction root for archives
    pub fn temp_dir(&self) -> &Path {
        &self.config.temp_dir
    }

    /// Directory the index step writes into
    pub fn index_dir(&self) -> &Path {
        &self.config.index_dir
    }

    /// Directory holding search outputs
    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Return the workspace to a clean slate
    ///
    /// Removes the extraction root and the index directory, then recreates an
    /// empty index directory. With `clean_output` the output directory is also
    /// emptied; that only happens once, at batch start.
    pub fn reset(&self, clean_output: bool) -> Result<()> {
        remove_dir_if_present(self.temp_dir())?;
        remove_dir_if_present(self.index_dir())?;
        create_dir(self.index_dir())?;

        if clean_output {
            remove_dir_if_present(self.output_dir())?;
            create_dir(self.output_dir())?;
        }

        debug!(
            index_dir = %self.index_dir().display(),
            clean_output,
            "Workspace reset"
        );
        Ok(())
    }

    /// Remove the extraction root and the index directory, recreating nothing
    pub fn final_teardown(&self) -> Result<()> {
        remove_dir_if_present(self.temp_dir())?;
        remove_dir_if_present(self.index_dir())?;
        debug!("Workspace torn down");
        Ok(())
    }
}

/// Recursively delete `path`; a missing directory counts as already clean
fn remove_dir_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::workspace(path, format!("failed to remove: {e}"))),
    }
}

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .map_err(|e| Error::workspace(path, format!("failed to create: {e}")))
}
