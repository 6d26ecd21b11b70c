//! Configuration module for the irgrade harness
//!
//! This module provides configuration structures and loading mechanisms for the
//! harness. Configuration can be loaded from TOML files and/or environment
//! variables, and is built once at startup and passed by reference to every
//! component that needs a path, a command or a time limit.

mod defaults;
mod loading;


use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use defaults::*;

/// Returns the path to the global configuration file
///
/// The global config is stored at `~/.irgrade/config.toml` and is used when no
/// explicit `--config` path is given.
pub fn global_config_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| Error::config("Unable to determine home directory".to_string()))?;
    Ok(home_dir.join(".irgrade").join("config.toml"))
}

/// Main configuration structure for the harness
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Workspace directories
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Fixed inputs handed to every submission
    #[serde(default)]
    pub inputs: InputsConfig,

    /// Time and capture limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Commands used to drive a submission
    #[serde(default)]
    pub commands: CommandsConfig,
}

/// Directories owned by the harness during a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Extraction root; each archive is unpacked here
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Directory the index step writes into
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,

    /// Directory holding one `<identifier>.txt` search output per submission
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// JSON Lines batch report
    #[serde(default = "default_results_file")]
    pub results_file: PathBuf,
}

/// Inputs passed through to submissions untouched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputsConfig {
    /// Data dump given to the index script
    #[serde(default = "default_dump_path")]
    pub dump_path: PathBuf,

    /// Query file given to the search script, one query per line
    #[serde(default = "default_query_file")]
    pub query_file: PathBuf,
}

/// Limits applied to each external step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Wall-clock limit for the index step in seconds (default: 180)
    #[serde(default = "default_index_timeout_secs")]
    pub index_timeout_secs: u64,

    /// Wall-clock limit for the search step in seconds (default: 120)
    #[serde(default = "default_search_timeout_secs")]
    pub search_timeout_secs: u64,

    /// Bytes of stdout/stderr tail kept per step for debug logging
    #[serde(default = "default_capture_limit_bytes")]
    pub capture_limit_bytes: usize,
}

/// How the submission scripts are invoked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    /// Interpreter used to run the scripts (default: "bash")
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Index script, relative to the submission root
    #[serde(default = "default_index_script")]
    pub index_script: String,

    /// Search script, relative to the submission root
    #[serde(default = "default_search_script")]
    pub search_script: String,
}

// Default implementations

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            index_dir: default_index_dir(),
            output_dir: default_output_dir(),
            results_file: default_results_file(),
        }
    }
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            dump_path: default_dump_path(),
            query_file: default_query_file(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            index_timeout_secs: default_index_timeout_secs(),
            search_timeout_secs: default_search_timeout_secs(),
            capture_limit_bytes: default_capture_limit_bytes(),
        }
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            index_script: default_index_script(),
            search_script: default_search_script(),
        }
    }
}

impl LimitsConfig {
    /// Get the index step timeout
    pub fn index_timeout(&self) -> Duration {
        Duration::from_secs(self.index_timeout_secs)
    }

    /// Get the search step timeout
    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }
}

impl WorkspaceConfig {
    /// Path of the search output file for a submission
    pub fn output_file(&self, identifier: &str) -> PathBuf {
        self.output_dir.join(format!("{identifier}.txt"))
    }
}

impl HarnessConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let paths = [
            ("workspace.temp_dir", &self.workspace.temp_dir),
            ("workspace.index_dir", &self.workspace.index_dir),
            ("workspace.output_dir", &self.workspace.output_dir),
            ("workspace.results_file", &self.workspace.results_file),
            ("inputs.dump_path", &self.inputs.dump_path),
            ("inputs.query_file", &self.inputs.query_file),
        ];
        for (key, path) in paths {
            if path.as_os_str().is_empty() {
                return Err(Error::config(format!("{key} must not be empty")));
            }
        }

        // The workspace directories are deleted independently, so none may
        // alias or contain another
        let ws = &self.workspace;
        let dirs = [
            ("workspace.temp_dir", &ws.temp_dir),
            ("workspace.index_dir", &ws.index_dir),
            ("workspace.output_dir", &ws.output_dir),
        ];
        for (i, (key_a, a)) in dirs.iter().enumerate() {
            for (key_b, b) in &dirs[i + 1..] {
                if a == b {
                    return Err(Error::config(format!(
                        "{key_a} and {key_b} must be distinct"
                    )));
                }
                if a.starts_with(b) || b.starts_with(a) {
                    return Err(Error::config(format!(
                        "{key_a} and {key_b} must not be nested inside each other"
                    )));
                }
            }
        }

        if self.limits.index_timeout_secs == 0 {
            return Err(Error::config(
                "limits.index_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.limits.search_timeout_secs == 0 {
            return Err(Error::config(
                "limits.search_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.limits.capture_limit_bytes == 0 {
            return Err(Error::config(
                "limits.capture_limit_bytes must be greater than 0".to_string(),
            ));
        }

        let commands = [
            ("commands.interpreter", &self.commands.interpreter),
            ("commands.index_script", &self.commands.index_script),
            ("commands.search_script", &self.commands.search_script),
        ];
        for (key, value) in commands {
            if value.trim().is_empty() {
                return Err(Error::config(format!("{key} must not be empty")));
            }
        }

        // Scripts run from inside the submission root; see `resolve_paths`
        let script_paths = [
            ("workspace.temp_dir", &ws.temp_dir),
            ("workspace.index_dir", &ws.index_dir),
            ("workspace.output_dir", &ws.output_dir),
            ("inputs.dump_path", &self.inputs.dump_path),
            ("inputs.query_file", &self.inputs.query_file),
        ];
        for (key, path) in script_paths {
            if path.is_relative() {
                return Err(Error::config(format!(
                    "{key} must be an absolute path (got {})",
                    path.display()
                )));
            }
        }

        Ok(())
    }

    /// Resolve every configured path against `base`
    ///
    /// Submission scripts run with the submission root as their working
    /// directory, so relative paths handed to them would resolve against the
    /// wrong place.
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.workspace.temp_dir);
        resolve(&mut self.workspace.index_dir);
        resolve(&mut self.workspace.output_dir);
        resolve(&mut self.workspace.results_file);
        resolve(&mut self.inputs.dump_path);
        resolve(&mut self.inputs.query_file);
        self
    }
}
