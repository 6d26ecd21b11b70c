//! Shared fixtures for harness integration tests

#![allow(dead_code)]

use irgrade_core::config::HarnessConfig;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Index script that copies the dump into the index directory
pub const COPYING_INDEX: &str = "#!/bin/bash\nset -e\ncp \"$1\" \"$2/dump.copy\"\n";

/// Search script that writes one result block per query
pub const ECHO_SEARCH: &str = "#!/bin/bash\nset -e\nwhile IFS= read -r q; do\n  echo \"title for $q\"\n  echo\ndone < \"$2\" > \"$3\"\n";

pub const FAILING_SCRIPT: &str = "#!/bin/bash\necho 'boom' >&2\nexit 1\n";

pub const SLEEPING_SCRIPT: &str = "#!/bin/bash\nsleep 30\n";

/// A scratch grading environment with its own config
pub struct TestHarness {
    pub root: TempDir,
    pub config: HarnessConfig,
    pub submissions: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let root = TempDir::new().expect("tempdir");
        let base = root.path();

        let data = base.join("data");
        std::fs::create_dir_all(&data).expect("data dir");
        std::fs::write(data.join("dump.xml"), "<page><title>Rust</title></page>\n".repeat(50))
            .expect("dump");
        std::fs::write(data.join("queries.txt"), "rust\nsearch engines\n").expect("queries");

        let submissions = base.join("submissions");
        std::fs::create_dir_all(&submissions).expect("submissions dir");

        let mut config = HarnessConfig::default();
        config.workspace.temp_dir = base.join("temp");
        config.workspace.index_dir = base.join("index");
        config.workspace.output_dir = base.join("output");
        config.workspace.results_file = base.join("results.jsonl");
        config.inputs.dump_path = data.join("dump.xml");
        config.inputs.query_file = data.join("queries.txt");
        config.limits.index_timeout_secs = 10;
        config.limits.search_timeout_secs = 10;

        Self {
            root,
            config,
            submissions,
        }
    }

    pub fn with_timeouts(mut self, index_secs: u64, search_secs: u64) -> Self {
        self.config.limits.index_timeout_secs = index_secs;
        self.config.limits.search_timeout_secs = search_secs;
        self
    }

    /// Package `<identifier>/index.sh` and `<identifier>/search.sh` into `<identifier>.zip`
    pub fn add_submission(&self, identifier: &str, index_sh: &str, search_sh: &str) -> PathBuf {
        let index_entry = format!("{identifier}/index.sh");
        let search_entry = format!("{identifier}/search.sh");
        self.add_zip(
            &format!("{identifier}.zip"),
            &[
                (index_entry.as_str(), index_sh.as_bytes()),
                (search_entry.as_str(), search_sh.as_bytes()),
            ],
        )
    }

    /// Write an arbitrary zip into the submissions directory
    pub fn add_zip(&self, file_name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
        let path = self.submissions.join(file_name);
        write_zip(&path, entries);
        path
    }

    /// Write a file that is not a zip archive
    pub fn add_corrupt(&self, file_name: &str) -> PathBuf {
        let path = self.submissions.join(file_name);
        std::fs::write(&path, b"PK\x03\x04 definitely truncated").expect("corrupt archive");
        path
    }

    pub fn output_file(&self, identifier: &str) -> PathBuf {
        self.config.workspace.output_file(identifier)
    }
}

pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).expect("create zip");
    let mut zip = zip::ZipWriter::new(file);
    for (name, content) in entries {
        zip.start_file(*name, SimpleFileOptions::default())
            .expect("start zip entry");
        zip.write_all(content).expect("write zip entry");
    }
    zip.finish().expect("finish zip");
}

/// Whether `pid` is a live (non-zombie) process
#[cfg(target_os = "linux")]
pub fn process_alive(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => {
            let state = stat
                .rsplit_once(')')
                .and_then(|(_, rest)| rest.trim_start().chars().next());
            !matches!(state, Some('Z') | Some('X') | None)
        }
        Err(_) => false,
    }
}
