//! Index size measurement

use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Total bytes of regular files under `path`
///
/// Symbolic links are never followed or counted. A missing tree measures 0.
/// Entries that disappear or cannot be read during the walk are skipped, so
/// the result is a lower bound when the tree is changing underneath us.
pub fn measure(path: &Path) -> u64 {
    if !path.exists() {
        return 0;
    }

    let mut total = 0u64;
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry while measuring {}: {e}", path.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.metadata() {
            Ok(meta) => total += meta.len(),
            Err(e) => debug!("Skipping {}: {e}", entry.path().display()),
        }
    }
    total
}
