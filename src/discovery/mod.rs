//! File discovery.
//!
//! Walks the workspace with `walkdir`, pruning excluded directories before
//! descending and excluding files by path and size before anything is read.

pub mod filter;

pub use filter::{extension_of, FileFilter};

use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::diagnostics::{DiagnosticStage, ScanDiagnostic, SkipReason};
use crate::error_codes::{CM_IO_001_READ_FAILED, CM_IO_002_WALK_FAILED};

/// A file that passed every exclusion rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Root-joined path used for reading
    pub path: PathBuf,
    /// Relative path, forward slashes
    pub rel_path: String,
    pub size: u64,
}

/// A file left out by a content-independent rule, kept for byte totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedFile {
    pub rel_path: String,
    pub size: u64,
    pub reason: SkipReason,
}

#[derive(Debug, Default)]
pub struct Discovery {
    /// Candidates in traversal order (siblings sorted by name)
    pub files: Vec<DiscoveredFile>,
    /// Binary-by-extension and oversized files
    pub excluded: Vec<ExcludedFile>,
    pub diagnostics: Vec<ScanDiagnostic>,
}

/// Walk `root` and collect candidate files.
///
/// # Guarantees
/// - Siblings are visited in lexicographic order, so the output order is
///   deterministic for a given tree
/// - Excluded directories are never descended into
/// - Unreadable directories produce a diagnostic; their siblings are still
///   walked
/// - Symlinks are not followed
pub fn discover_files(root: &Path, filter: &FileFilter) -> Discovery {
    let mut discovery = Discovery::default();

    let mut walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    loop {
        let entry = match walker.next() {
            None => break,
            Some(Ok(entry)) => entry,
            Some(Err(err)) => {
                let rel_path = err
                    .path()
                    .map(|p| filter.relative_path(p))
                    .unwrap_or_default();
                tracing::warn!(path = %rel_path, error = %err, "cannot list directory");
                discovery.diagnostics.push(ScanDiagnostic::error(
                    rel_path,
                    DiagnosticStage::Discover,
                    CM_IO_002_WALK_FAILED,
                    err.to_string(),
                ));
                continue;
            }
        };

        if entry.depth() == 0 {
            continue;
        }

        let rel_path = filter.relative_path(entry.path());
        let file_type = entry.file_type();

        if file_type.is_dir() {
            if let Some(reason) = filter.skip_dir(&rel_path) {
                tracing::trace!(path = %rel_path, %reason, "pruned directory");
                discovery
                    .diagnostics
                    .push(ScanDiagnostic::skipped(rel_path, reason));
                walker.skip_current_dir();
            }
            continue;
        }

        if !file_type.is_file() {
            discovery
                .diagnostics
                .push(ScanDiagnostic::skipped(rel_path, SkipReason::NotAFile));
            continue;
        }

        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(err) => {
                discovery.diagnostics.push(ScanDiagnostic::error(
                    rel_path,
                    DiagnosticStage::Read,
                    CM_IO_001_READ_FAILED,
                    err.to_string(),
                ));
                continue;
            }
        };

        match filter.skip_file(&rel_path, size) {
            Some(reason) => {
                if matches!(reason, SkipReason::BinaryExtension | SkipReason::TooLarge) {
                    discovery.excluded.push(ExcludedFile {
                        rel_path: rel_path.clone(),
                        size,
                        reason,
                    });
                }
                discovery
                    .diagnostics
                    .push(ScanDiagnostic::skipped(rel_path, reason));
            }
            None => discovery.files.push(DiscoveredFile {
                path: entry.into_path(),
                rel_path,
                size,
            }),
        }
    }

    tracing::debug!(
        candidates = discovery.files.len(),
        excluded = discovery.excluded.len(),
        "discovery finished"
    );

    discovery
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discovery_order_and_pruning() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src/b")).unwrap();
        fs::create_dir_all(root.join("node_modules/x")).unwrap();
        fs::write(root.join("src/b/z.ts"), "z").unwrap();
        fs::write(root.join("src/a.ts"), "a").unwrap();
        fs::write(root.join("README.md"), "# r").unwrap();
        fs::write(root.join("node_modules/x/index.js"), "x").unwrap();

        let filter = FileFilter::new(root, &ScanConfig::default());
        let discovery = discover_files(root, &filter);

        let paths: Vec<&str> = discovery.files.iter().map(|f| f.rel_path.as_str()).collect();
        assert_eq!(paths, vec!["README.md", "src/a.ts", "src/b/z.ts"]);
        assert!(discovery
            .diagnostics
            .iter()
            .any(|d| d.path() == "node_modules"));
    }

    #[test]
    fn test_excluded_files_keep_their_size() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("photo.png"), vec![0u8; 2048]).unwrap();
        fs::write(root.join("main.py"), "print(1)").unwrap();

        let filter = FileFilter::new(root, &ScanConfig::default());
        let discovery = discover_files(root, &filter);

        assert_eq!(discovery.files.len(), 1);
        assert_eq!(
            discovery.excluded,
            vec![ExcludedFile {
                rel_path: "photo.png".into(),
                size: 2048,
                reason: SkipReason::BinaryExtension,
            }]
        );
    }
}
