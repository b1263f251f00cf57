//! Path validation for user-supplied and watcher-supplied paths.
//!
//! `codemap update <FILE>` and the watch loop both hand the engine paths that
//! did not come from discovery. Those must resolve inside the workspace root
//! before anything is read.

use camino::Utf8PathBuf;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    /// Path cannot be canonicalized (doesn't exist or permission denied)
    #[error("cannot canonicalize path: {0}")]
    CannotCanonicalize(String),

    /// Resolved path escapes the workspace root
    #[error("path escapes workspace root: {0} (root: {1})")]
    OutsideRoot(String, String),

    /// Path contains suspicious traversal patterns
    #[error("path contains suspicious traversal patterns: {0}")]
    SuspiciousTraversal(String),

    /// Path is not valid UTF-8 and cannot appear in the report
    #[error("path is not valid UTF-8: {0}")]
    NonUtf8(String),
}

/// Resolve symlinks, `.` and `..` to an absolute path.
pub fn canonicalize_path(path: &Path) -> Result<PathBuf, PathValidationError> {
    std::fs::canonicalize(path)
        .map_err(|_| PathValidationError::CannotCanonicalize(path.to_string_lossy().to_string()))
}

/// Validate that `path` resolves inside `root`.
///
/// Relative paths are taken relative to `root`, not the process working
/// directory.
///
/// # Returns
/// The canonical path on success.
pub fn validate_path_within_root(path: &Path, root: &Path) -> Result<PathBuf, PathValidationError> {
    let path_str = path.to_string_lossy();
    if has_suspicious_traversal(&path_str) {
        return Err(PathValidationError::SuspiciousTraversal(path_str.to_string()));
    }

    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };
    let canonical_path = canonicalize_path(&joined)?;
    let canonical_root = canonicalize_path(root)?;

    if !canonical_path.starts_with(&canonical_root) {
        return Err(PathValidationError::OutsideRoot(
            canonical_path.to_string_lossy().to_string(),
            canonical_root.to_string_lossy().to_string(),
        ));
    }

    Ok(canonical_path)
}

/// Validate `path` and return it relative to `root`, with forward slashes.
///
/// This is the form used for cache keys and report entries.
pub fn relative_to_root(path: &Path, root: &Path) -> Result<String, PathValidationError> {
    let canonical_path = validate_path_within_root(path, root)?;
    let canonical_root = canonicalize_path(root)?;

    let relative = canonical_path
        .strip_prefix(&canonical_root)
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let utf8 = Utf8PathBuf::from_path_buf(relative)
        .map_err(|p| PathValidationError::NonUtf8(p.to_string_lossy().to_string()))?;

    Ok(utf8
        .components()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join("/"))
}

/// Pre-check for traversal patterns, before the filesystem is touched.
///
/// Flags three or more `..` components anywhere, and `./x/..` sequences that
/// hide a climb behind a forward step. Both separators are considered.
pub fn has_suspicious_traversal(path: &str) -> bool {
    let normalized = path.replace('\\', "/");
    let parts: Vec<&str> = normalized.split('/').collect();

    if parts.iter().filter(|p| **p == "..").count() >= 3 {
        return true;
    }

    parts
        .iter()
        .enumerate()
        .any(|(i, part)| *part == "." && parts[i + 1..].iter().any(|p| *p == ".."))
}
