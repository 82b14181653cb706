//! Test file discovery
//!
//! Walks a directory tree and collects files whose base name matches a shell
//! glob. Entries are visited in file-name order at every level, so the result
//! is stable across runs over an unchanged tree.

use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::models::{RunnerError, RunnerResult};

/// Collect every non-directory entry under `root` whose file name matches
/// `pattern`. The root itself is included when it is a matching file.
pub fn discover_files(root: &Path, pattern: &str) -> RunnerResult<Vec<PathBuf>> {
    let matcher = Pattern::new(pattern).map_err(|source| RunnerError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut files = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| RunnerError::Discovery {
            root: root.to_path_buf(),
            source,
        })?;

        if entry.file_type().is_dir() {
            continue;
        }

        if matcher.matches(&entry.file_name().to_string_lossy()) {
            files.push(entry.into_path());
        }
    }

    debug!(
        "Discovered {} files matching '{}' under {}",
        files.len(),
        pattern,
        root.display()
    );

    Ok(files)
}
