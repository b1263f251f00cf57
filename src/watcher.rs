//! Filesystem watcher with debounced batch events.
//!
//! All events within a debounce window are collected, filtered through the
//! same exclusion rules as discovery, de-duplicated, sorted and emitted as a
//! single [`WatcherBatch`]. The scan's own writes (the report file and the
//! `.codemap/` directory) are excluded there, so a scan never retriggers itself.

use anyhow::Result;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::ScanConfig;
use crate::discovery::FileFilter;
use crate::validation::{relative_to_root, PathValidationError};

/// Deterministic batch of changed paths.
///
/// Paths are relative to the watched root, forward slashes, sorted. A path
/// may name a file that no longer exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatcherBatch {
    pub paths: Vec<String>,
}

impl WatcherBatch {
    fn from_set(paths: BTreeSet<String>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// The only path of a one-file batch.
    pub fn single(&self) -> Option<&str> {
        match self.paths.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub root_path: PathBuf,
    pub debounce_ms: u64,
}

impl WatcherConfig {
    pub fn from_scan_config(root: &Path, config: &ScanConfig) -> Self {
        Self {
            root_path: root.to_path_buf(),
            debounce_ms: config.debounce_ms,
        }
    }
}

/// Watcher that emits debounced batches of changed paths.
pub struct FileSystemWatcher {
    watcher_thread: Option<thread::JoinHandle<()>>,
    batch_receiver: Receiver<WatcherBatch>,
}

impl FileSystemWatcher {
    /// Start watching `config.root_path` recursively.
    ///
    /// # Arguments
    /// * `config` - Root and debounce window
    /// * `filter` - Exclusion rules for the same root
    /// * `shutdown` - Set to stop the watcher thread
    pub fn new(config: WatcherConfig, filter: FileFilter, shutdown: Arc<AtomicBool>) -> Result<Self> {
        let (batch_tx, batch_rx) = mpsc::channel();

        let thread = thread::spawn(move || {
            if let Err(err) = run_watcher(config, filter, batch_tx, shutdown) {
                tracing::error!(error = %err, "watcher stopped");
            }
        });

        Ok(Self {
            watcher_thread: Some(thread),
            batch_receiver: batch_rx,
        })
    }

    /// Receive the next batch, blocking until available.
    ///
    /// # Returns
    /// `None` if the watcher thread has terminated
    pub fn recv_batch(&self) -> Option<WatcherBatch> {
        self.batch_receiver.recv().ok()
    }

    /// Receive the next batch with a timeout.
    ///
    /// # Returns
    /// - `Ok(Some(batch))` if a batch is available
    /// - `Ok(None)` if the watcher thread has terminated
    /// - `Err(())` if the timeout elapsed
    #[allow(clippy::result_unit_err)]
    pub fn recv_batch_timeout(&self, timeout: Duration) -> Result<Option<WatcherBatch>, ()> {
        match self.batch_receiver.recv_timeout(timeout) {
            Ok(batch) => Ok(Some(batch)),
            Err(RecvTimeoutError::Timeout) => Err(()),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }

    /// Join the watcher thread. The shutdown flag must already be set.
    pub fn shutdown(mut self) {
        if let Some(thread) = self.watcher_thread.take() {
            let _ = thread.join();
        }
    }
}

fn run_watcher(
    config: WatcherConfig,
    filter: FileFilter,
    tx: Sender<WatcherBatch>,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let root = config.root_path.clone();

    let mut debouncer = new_debouncer(
        Duration::from_millis(config.debounce_ms),
        move |result: DebounceEventResult| match result {
            Ok(events) => {
                let paths = events.iter().map(|event| event.path.as_path());
                let dirty = extract_dirty_paths(paths, &root, &filter);
                if !dirty.is_empty() {
                    tracing::debug!(count = dirty.len(), "change batch");
                    let _ = tx.send(WatcherBatch::from_set(dirty));
                }
            }
            Err(err) => tracing::warn!(error = %err, "watch error"),
        },
    )?;

    debouncer
        .watcher()
        .watch(&config.root_path, RecursiveMode::Recursive)?;
    tracing::info!(root = %config.root_path.display(), "watching for changes");

    while !shutdown.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(200));
    }

    Ok(())
}

/// Reduce raw events to the relative paths a scan would care about.
///
/// - Directories are skipped (their files produce their own events)
/// - Existing files go through [`FileFilter::should_skip`] and must resolve
///   inside the root
/// - Vanished files are kept unless their path alone excludes them, so a
///   deletion still prunes the report
fn extract_dirty_paths<'a>(
    paths: impl IntoIterator<Item = &'a Path>,
    root: &Path,
    filter: &FileFilter,
) -> BTreeSet<String> {
    let mut dirty = BTreeSet::new();

    for path in paths {
        if path.is_dir() {
            continue;
        }

        if path.exists() {
            if filter.should_skip(path).is_some() {
                continue;
            }
            match relative_to_root(path, root) {
                Ok(rel) => {
                    dirty.insert(rel);
                }
                Err(PathValidationError::CannotCanonicalize(_)) => {}
                Err(err) => tracing::warn!(error = %err, "watcher rejected path"),
            }
        } else if let Some(rel) = vanished_relative(path, root, filter) {
            dirty.insert(rel);
        }
    }

    dirty
}

fn vanished_relative(path: &Path, root: &Path, filter: &FileFilter) -> Option<String> {
    let inside = path.starts_with(root)
        || std::fs::canonicalize(root)
            .map(|canonical| path.starts_with(canonical))
            .unwrap_or(false);
    if !inside {
        return None;
    }

    let rel = filter.relative_path(path);
    if rel.is_empty() {
        return None;
    }
    let parts: Vec<&str> = rel.split('/').collect();
    for end in 1..parts.len() {
        if filter.skip_dir(&parts[..end].join("/")).is_some() {
            return None;
        }
    }
    if filter.skip_file(&rel, 0).is_some() {
        return None;
    }
    Some(rel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn extract(paths: &[PathBuf], root: &Path, filter: &FileFilter) -> BTreeSet<String> {
        extract_dirty_paths(paths.iter().map(PathBuf::as_path), root, filter)
    }

    #[test]
    fn test_extract_filters_generated_and_excluded_paths() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join(".codemap")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("src/b.ts"), "b").unwrap();
        fs::write(root.join("src/a.ts"), "a").unwrap();
        fs::write(root.join("CODEMAP.md"), "# CODEMAP").unwrap();
        fs::write(root.join(".codemap/index.json"), "{}").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "x").unwrap();

        let filter = FileFilter::new(root, &ScanConfig::default());
        let events = vec![
            root.join("src/b.ts"),
            root.join("CODEMAP.md"),
            root.join(".codemap/index.json"),
            root.join("node_modules/pkg/index.js"),
            root.join("src/a.ts"),
            root.join("src/b.ts"),
            root.join("src"),
        ];

        let dirty = extract(&events, root, &filter);
        let batch = WatcherBatch::from_set(dirty);
        assert_eq!(batch.paths, vec!["src/a.ts", "src/b.ts"]);
        assert_eq!(batch.single(), None);
    }

    #[test]
    fn test_deleted_file_is_reported() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let filter = FileFilter::new(root, &ScanConfig::default());

        let dirty = extract(&[root.join("src/gone.py")], root, &filter);
        let batch = WatcherBatch::from_set(dirty);
        assert_eq!(batch.single(), Some("src/gone.py"));

        let dirty = extract(&[root.join(".codemap/index.json")], root, &filter);
        assert!(dirty.is_empty());
    }

    #[test]
    fn test_watcher_shutdown_joins() {
        let temp = TempDir::new().unwrap();
        let config = WatcherConfig::from_scan_config(temp.path(), &ScanConfig::default());
        let filter = FileFilter::new(temp.path(), &ScanConfig::default());
        let shutdown = Arc::new(AtomicBool::new(false));

        let watcher = FileSystemWatcher::new(config, filter, shutdown.clone()).unwrap();
        assert!(watcher
            .recv_batch_timeout(Duration::from_millis(50))
            .is_err());
        shutdown.store(true, Ordering::SeqCst);
        watcher.shutdown();
    }
}
