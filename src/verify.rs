//! Cache verification.
//!
//! Compares the incremental cache against the filesystem without analyzing
//! anything or writing any file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::cache::IncrementalCache;
use crate::config::ScanConfig;
use crate::discovery::{discover_files, FileFilter};
use crate::error::ScanError;
use crate::hash::compute_hash;

/// Differences between the cache and the current tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// In the cache but no longer a candidate on disk
    pub missing: Vec<String>,
    /// Candidates on disk with no cache entry
    pub new: Vec<String>,
    /// Candidates whose content hash differs from the cached one
    pub modified: Vec<String>,
    pub unchanged: usize,
}

impl VerifyReport {
    pub fn total_issues(&self) -> usize {
        self.missing.len() + self.new.len() + self.modified.len()
    }

    /// True when the next scan would reuse every cached record.
    pub fn is_clean(&self) -> bool {
        self.total_issues() == 0
    }
}

/// Verify the cache of `root` against the filesystem.
///
/// Uses the same discovery rules as a scan, so a file the scanner would skip
/// is never reported as new. Every list in the result is sorted.
///
/// # Errors
/// - [`ScanError::WorkspaceNotFound`] if `root` is not a directory
/// - [`ScanError::CacheCorruption`] if the cache exists but cannot be used
pub fn verify_cache(root: &Path, config: &ScanConfig) -> Result<VerifyReport, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::WorkspaceNotFound(root.to_path_buf()));
    }

    let (cache, corruption) = IncrementalCache::load(root);
    if let Some(err) = corruption {
        return Err(err);
    }

    let filter = FileFilter::new(root, config);
    let discovery = discover_files(root, &filter);

    let mut report = VerifyReport::default();
    let mut live = BTreeSet::new();

    for file in &discovery.files {
        live.insert(file.rel_path.as_str());
        let Some(entry) = cache.entry(&file.rel_path) else {
            report.new.push(file.rel_path.clone());
            continue;
        };
        match std::fs::read(&file.path) {
            Ok(bytes) if compute_hash(&bytes) == entry.hash => report.unchanged += 1,
            Ok(_) => report.modified.push(file.rel_path.clone()),
            Err(err) => {
                tracing::warn!(path = %file.rel_path, error = %err, "cannot read file for verification");
                report.modified.push(file.rel_path.clone());
            }
        }
    }

    report.missing = cache
        .files
        .keys()
        .filter(|path| !live.contains(path.as_str()))
        .cloned()
        .collect();

    report.new.sort();
    report.modified.sort();

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{full_scan, ScanContext};
    use std::fs;
    use tempfile::TempDir;

    fn config() -> ScanConfig {
        ScanConfig {
            enable_git: false,
            ..ScanConfig::default()
        }
    }

    #[test]
    fn test_no_cache_reports_everything_new() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b.py"), "print(1)\n").unwrap();
        fs::write(temp.path().join("a.py"), "print(2)\n").unwrap();

        let report = verify_cache(temp.path(), &config()).unwrap();
        assert_eq!(report.new, vec!["a.py", "b.py"]);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_detects_modified_missing_and_new() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("keep.py"), "x = 1\n").unwrap();
        fs::write(temp.path().join("edit.py"), "y = 1\n").unwrap();
        fs::write(temp.path().join("gone.py"), "z = 1\n").unwrap();
        full_scan(temp.path(), &config(), &ScanContext::new()).unwrap();

        let clean = verify_cache(temp.path(), &config()).unwrap();
        assert!(clean.is_clean(), "fresh scan should verify clean: {:?}", clean);
        assert_eq!(clean.unchanged, 3);

        fs::write(temp.path().join("edit.py"), "y = 2\n").unwrap();
        fs::remove_file(temp.path().join("gone.py")).unwrap();
        fs::write(temp.path().join("added.py"), "w = 1\n").unwrap();

        let report = verify_cache(temp.path(), &config()).unwrap();
        assert_eq!(report.modified, vec!["edit.py"]);
        assert_eq!(report.missing, vec!["gone.py"]);
        assert_eq!(report.new, vec!["added.py"]);
        assert_eq!(report.total_issues(), 3);
    }

    #[test]
    fn test_corrupt_cache_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = IncrementalCache::path_for(temp.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();

        let err = verify_cache(temp.path(), &config()).unwrap_err();
        assert!(matches!(err, ScanError::CacheCorruption { .. }));
    }
}
