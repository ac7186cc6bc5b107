//! Workspace file enumeration and document reading.
//!
//! Enumeration walks the search root, applies exclude-then-include glob
//! filters against root-relative paths, sorts for deterministic ordering,
//! and caps the result at the configured file limit.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::error::{CodemarksError, Result};

/// Glob patterns excluded from every walk, before config excludes apply.
const DEFAULT_EXCLUDES: [&str; 3] = ["**/.git/**", "**/node_modules/**", "**/target/**"];

pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| CodemarksError::Configuration(format!("invalid glob '{pattern}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| CodemarksError::Configuration(format!("invalid glob set: {e}")))
}

/// Enumerate candidate files under `root` as absolute paths.
pub fn enumerate(
    root: &Path,
    include_globs: &[String],
    exclude_globs: &[String],
    max_files: usize,
) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(CodemarksError::Configuration(format!(
            "search root does not exist: {}",
            root.display()
        )));
    }

    let include_set = build_globset(include_globs)?;

    let mut all_excludes: Vec<String> =
        DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
    all_excludes.extend(exclude_globs.iter().cloned());
    let exclude_set = build_globset(&all_excludes)?;

    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| CodemarksError::Enumeration(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        // Apply exclude patterns
        if exclude_set.is_match(&rel_str) {
            continue;
        }

        // Apply include patterns
        if !include_set.is_match(&rel_str) {
            continue;
        }

        files.push(path.to_path_buf());
    }

    // Sort for deterministic ordering
    files.sort();
    files.truncate(max_files);

    Ok(files)
}

/// Read a document as UTF-8 text. Callers decide whether a failure skips
/// the file or aborts.
pub async fn read_document(path: &Path) -> std::io::Result<String> {
    tokio::fs::read_to_string(path).await
}
