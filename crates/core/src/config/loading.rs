//! Configuration loading from files and environment variables

use crate::error::{Error, Result};
use config::{Config as ConfigLib, ConfigBuilder as LibConfigBuilder, Environment, File};
use std::path::Path;
use tracing::debug;

use super::defaults::*;
use super::{global_config_path, HarnessConfig};

/// Helper to set a config default with consistent error mapping
fn set_config_default<T: Into<config::Value>>(
    builder: LibConfigBuilder<config::builder::DefaultState>,
    key: &str,
    value: T,
) -> Result<LibConfigBuilder<config::builder::DefaultState>> {
    builder
        .set_default(key, value)
        .map_err(|e| Error::config(format!("Failed to set {key} default: {e}")))
}

impl HarnessConfig {
    /// Loads configuration from a TOML file with environment variable overrides
    ///
    /// Environment variables are prefixed with `IRGRADE_` and use double underscores
    /// for nested values. For example:
    /// - `IRGRADE_LIMITS__INDEX_TIMEOUT_SECS=60`
    /// - `IRGRADE_WORKSPACE__RESULTS_FILE=/srv/grading/results.jsonl`
    pub fn from_file(path: &Path) -> Result<Self> {
        let builder = ConfigLib::builder();

        // Set defaults explicitly (config crate doesn't apply serde defaults for missing sections)
        let builder = set_config_default(builder, "workspace.temp_dir", DEFAULT_TEMP_DIR)?;
        let builder = set_config_default(builder, "workspace.index_dir", DEFAULT_INDEX_DIR)?;
        let builder = set_config_default(builder, "workspace.output_dir", DEFAULT_OUTPUT_DIR)?;
        let builder =
            set_config_default(builder, "workspace.results_file", DEFAULT_RESULTS_FILE)?;
        let builder = set_config_default(builder, "inputs.dump_path", DEFAULT_DUMP_PATH)?;
        let builder = set_config_default(builder, "inputs.query_file", DEFAULT_QUERY_FILE)?;
        let builder = set_config_default(
            builder,
            "limits.index_timeout_secs",
            default_index_timeout_secs() as i64,
        )?;
        let builder = set_config_default(
            builder,
            "limits.search_timeout_secs",
            default_search_timeout_secs() as i64,
        )?;
        let builder = set_config_default(
            builder,
            "limits.capture_limit_bytes",
            default_capture_limit_bytes() as i64,
        )?;
        let builder = set_config_default(builder, "commands.interpreter", DEFAULT_INTERPRETER)?;
        let builder =
            set_config_default(builder, "commands.index_script", DEFAULT_INDEX_SCRIPT)?;
        let mut builder =
            set_config_default(builder, "commands.search_script", DEFAULT_SEARCH_SCRIPT)?;

        // Add the config file if it exists
        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        // Add environment variables with IRGRADE_ prefix
        builder = builder.add_source(
            Environment::with_prefix("IRGRADE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize config: {e}")))
    }

    /// Creates a config from a TOML string (useful for testing)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration
    ///
    /// Precedence (lowest to highest):
    /// 1. Hardcoded defaults
    /// 2. Config file (~/.irgrade/config.toml or custom --config path)
    /// 3. Environment variables (IRGRADE_*)
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(p) => {
                if !p.exists() {
                    return Err(Error::config(format!(
                        "Config file {} does not exist",
                        p.display()
                    )));
                }
                p.to_path_buf()
            }
            None => global_config_path()?,
        };
        debug!("Loading configuration from {}", path.display());
        Self::from_file(&path)
    }
}
