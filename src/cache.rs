//! Incremental cache.
//!
//! Persisted at `<root>/.codemap/index.json`:
//!
//! ```json
//! {"version":1,"head":"a1b2c3d","files":{"src/app.ts":{"hash":"…","lang":"ts","lastScan":1700000000000}}}
//! ```
//!
//! Each entry may also carry the full `record` computed for its hash, so an
//! unchanged file is never analyzed twice. The cache is the only state that
//! outlives a scan. It is read concurrently by workers and written once, after
//! all workers have finished, through a temp-file-then-rename replace.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::ScanError;
use crate::model::FileRecord;

/// Hidden project-local directory holding the cache (and optional config).
pub const CACHE_DIR: &str = ".codemap";

pub const CACHE_FILE: &str = "index.json";

pub const CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub hash: String,
    pub lang: String,
    /// Epoch milliseconds of the scan that last saw this content change
    pub last_scan: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<FileRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementalCache {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
    /// Analysis settings the cached records were produced under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub files: BTreeMap<String, CacheEntry>,
}

impl Default for IncrementalCache {
    fn default() -> Self {
        Self {
            version: CACHE_VERSION,
            head: None,
            fingerprint: None,
            files: BTreeMap::new(),
        }
    }
}

impl IncrementalCache {
    /// Cache file location for a workspace root.
    pub fn path_for(root: &Path) -> PathBuf {
        root.join(CACHE_DIR).join(CACHE_FILE)
    }

    /// Load the cache for a workspace.
    ///
    /// A missing file yields an empty cache. An unreadable or unparsable file,
    /// or one with an unknown version, also yields an empty cache plus the
    /// [`ScanError::CacheCorruption`] describing why it was discarded.
    pub fn load(root: &Path) -> (Self, Option<ScanError>) {
        let path = Self::path_for(root);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return (Self::default(), None)
            }
            Err(err) => return (Self::default(), Some(corruption(path, err.to_string()))),
        };

        match serde_json::from_str::<IncrementalCache>(&text) {
            Ok(cache) if cache.version == CACHE_VERSION => (cache, None),
            Ok(cache) => (
                Self::default(),
                Some(corruption(
                    path,
                    format!("unsupported cache version {}", cache.version),
                )),
            ),
            Err(err) => (Self::default(), Some(corruption(path, err.to_string()))),
        }
    }

    pub fn entry(&self, rel_path: &str) -> Option<&CacheEntry> {
        self.files.get(rel_path)
    }

    /// Cached record for `rel_path`, only if it was computed for `hash`.
    pub fn lookup(&self, rel_path: &str, hash: &str) -> Option<&FileRecord> {
        self.files
            .get(rel_path)
            .filter(|entry| entry.hash == hash)
            .and_then(|entry| entry.record.as_ref())
    }

    /// Drop cached records produced under different analysis settings.
    ///
    /// Hashes and timestamps are kept; only the records are invalidated.
    pub fn retain_records_for(&mut self, fingerprint: &str) {
        if self.fingerprint.as_deref() == Some(fingerprint) {
            return;
        }
        let dropped = self
            .files
            .values_mut()
            .filter_map(|entry| entry.record.take())
            .count();
        if dropped > 0 {
            tracing::info!(dropped, "analysis settings changed; cached records discarded");
        }
        self.fingerprint = Some(fingerprint.to_string());
    }

    /// Record the results of a scan.
    ///
    /// Entries not in `live_paths` are pruned, then `updates` are applied in
    /// order. Called once per scan, after every worker has finished.
    pub fn apply(&mut self, updates: Vec<(String, CacheEntry)>, live_paths: &BTreeSet<String>) {
        self.files.retain(|path, _| live_paths.contains(path));
        for (path, entry) in updates {
            self.files.insert(path, entry);
        }
    }

    /// Atomically replace the on-disk cache.
    pub fn save(&self, root: &Path) -> Result<(), ScanError> {
        let path = Self::path_for(root);
        let json = serde_json::to_vec(self).map_err(|err| ScanError::Output {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, err),
        })?;
        write_atomic(&path, &json).map_err(|source| ScanError::Output { path, source })
    }
}

fn corruption(path: PathBuf, reason: String) -> ScanError {
    ScanError::CacheCorruption { path, reason }
}

/// Write `bytes` to `path` via a sibling temp file and a rename.
///
/// Readers see either the old content or the new content, never a partial
/// write. Parent directories are created as needed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(hash: &str) -> CacheEntry {
        CacheEntry {
            hash: hash.to_string(),
            lang: "ts".to_string(),
            last_scan: 1_700_000_000_000,
            record: None,
        }
    }

    #[test]
    fn test_missing_cache_is_empty_without_error() {
        let temp = TempDir::new().unwrap();
        let (cache, err) = IncrementalCache::load(temp.path());
        assert!(cache.files.is_empty());
        assert!(err.is_none());
    }

    #[test]
    fn test_corrupt_cache_is_discarded() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(CACHE_DIR)).unwrap();
        std::fs::write(IncrementalCache::path_for(temp.path()), "{not json").unwrap();

        let (cache, err) = IncrementalCache::load(temp.path());
        assert!(cache.files.is_empty());
        assert!(matches!(err, Some(ScanError::CacheCorruption { .. })));
    }

    #[test]
    fn test_unknown_version_is_discarded() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(CACHE_DIR)).unwrap();
        std::fs::write(
            IncrementalCache::path_for(temp.path()),
            r#"{"version":7,"files":{}}"#,
        )
        .unwrap();

        let (_, err) = IncrementalCache::load(temp.path());
        assert!(matches!(err, Some(ScanError::CacheCorruption { .. })));
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let mut cache = IncrementalCache::default();
        cache.head = Some("abc1234".into());
        cache.files.insert("src/a.ts".into(), entry("h1"));
        cache.save(temp.path()).unwrap();

        let (loaded, err) = IncrementalCache::load(temp.path());
        assert!(err.is_none());
        assert_eq!(loaded, cache);
    }

    #[test]
    fn test_on_disk_schema() {
        let temp = TempDir::new().unwrap();
        let mut cache = IncrementalCache::default();
        cache.files.insert("a.py".into(), entry("h1"));
        cache.save(temp.path()).unwrap();

        let text = std::fs::read_to_string(IncrementalCache::path_for(temp.path())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["files"]["a.py"]["hash"], "h1");
        assert_eq!(value["files"]["a.py"]["lang"], "ts");
        assert_eq!(value["files"]["a.py"]["lastScan"], 1_700_000_000_000i64);
        assert!(value.get("head").is_none());
    }

    #[test]
    fn test_lookup_requires_matching_hash() {
        let mut cache = IncrementalCache::default();
        let mut e = entry("h1");
        e.record = Some(FileRecord::from_partial(
            "a.ts".into(),
            "ts".into(),
            "h1".into(),
            1,
            "s".into(),
            Default::default(),
            false,
            crate::model::Limits {
                max_symbols: 150,
                max_refs: 50,
            },
        ));
        cache.files.insert("a.ts".into(), e);

        assert!(cache.lookup("a.ts", "h1").is_some());
        assert!(cache.lookup("a.ts", "h2").is_none());
        assert!(cache.lookup("b.ts", "h1").is_none());

        cache.retain_records_for("other-settings");
        assert!(cache.lookup("a.ts", "h1").is_none());
        assert_eq!(cache.entry("a.ts").unwrap().hash, "h1");
    }

    #[test]
    fn test_apply_prunes_dead_paths() {
        let mut cache = IncrementalCache::default();
        cache.files.insert("gone.ts".into(), entry("h0"));
        cache.files.insert("kept.ts".into(), entry("h1"));

        let live: BTreeSet<String> = ["kept.ts".to_string(), "new.ts".to_string()].into();
        cache.apply(vec![("new.ts".into(), entry("h2"))], &live);

        let keys: Vec<&String> = cache.files.keys().collect();
        assert_eq!(keys, vec!["kept.ts", "new.ts"]);
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/out.md");
        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "two");
    }
}
