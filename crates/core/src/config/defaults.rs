//! Default values and functions for configuration

use std::path::PathBuf;

// Default constants
pub(crate) const DEFAULT_TEMP_DIR: &str = "temp";
pub(crate) const DEFAULT_INDEX_DIR: &str = "index";
pub(crate) const DEFAULT_OUTPUT_DIR: &str = "output";
pub(crate) const DEFAULT_RESULTS_FILE: &str = "../results.jsonl";
pub(crate) const DEFAULT_DUMP_PATH: &str = "data/dump.xml";
pub(crate) const DEFAULT_QUERY_FILE: &str = "data/queries.txt";
pub(crate) const DEFAULT_INTERPRETER: &str = "bash";
pub(crate) const DEFAULT_INDEX_SCRIPT: &str = "index.sh";
pub(crate) const DEFAULT_SEARCH_SCRIPT: &str = "search.sh";

pub(crate) fn default_temp_dir() -> PathBuf {
    PathBuf::from(DEFAULT_TEMP_DIR)
}

pub(crate) fn default_index_dir() -> PathBuf {
    PathBuf::from(DEFAULT_INDEX_DIR)
}

pub(crate) fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

pub(crate) fn default_results_file() -> PathBuf {
    PathBuf::from(DEFAULT_RESULTS_FILE)
}

pub(crate) fn default_dump_path() -> PathBuf {
    PathBuf::from(DEFAULT_DUMP_PATH)
}

pub(crate) fn default_query_file() -> PathBuf {
    PathBuf::from(DEFAULT_QUERY_FILE)
}

pub(crate) fn default_index_timeout_secs() -> u64 {
    180
}

pub(crate) fn default_search_timeout_secs() -> u64 {
    120
}

pub(crate) fn default_capture_limit_bytes() -> usize {
    64 * 1024
}

pub(crate) fn default_interpreter() -> String {
    DEFAULT_INTERPRETER.to_string()
}

pub(crate) fn default_index_script() -> String {
    DEFAULT_INDEX_SCRIPT.to_string()
}

pub(crate) fn default_search_script() -> String {
    DEFAULT_SEARCH_SCRIPT.to_string()
}
