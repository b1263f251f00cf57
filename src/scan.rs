//! Scan pipeline.
//!
//! ```text
//! discover → hash → cache lookup → (changed) analyze → group → emit → persist cache
//! ```
//!
//! Hashing and analysis run per file on a bounded rayon pool. Results are
//! collected in discovery order, which is the only barrier: grouping, report
//! emission and the cache write all happen after it, on the calling thread.
//!
//! A cancelled scan writes nothing. Per-file failures never abort a scan;
//! they become [`ScanDiagnostic`]s and the scan status turns `Partial`.

use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::analyze::{language_tag, AnalyzeError, LanguageDispatcher};
use crate::cache::{write_atomic, CacheEntry, IncrementalCache};
use crate::config::ScanConfig;
use crate::diagnostics::ScanDiagnostic;
use crate::discovery::{discover_files, DiscoveredFile, FileFilter};
use crate::error::ScanError;
use crate::hash::{compute_hash, now_millis};
use crate::model::{FileRecord, Limits, PartialFileRecord};
use crate::report::{self, Report, ReportInput};
use crate::{git, group, importance};

/// Bytes inspected for a NUL when deciding a file is binary.
const BINARY_SNIFF_BYTES: usize = 8000;

/// Summary given to files with binary content.
pub const BINARY_SUMMARY: &str = "binary data";

/// Progress callback: `(processed, total)`.
pub type ProgressFn = dyn Fn(usize, usize) + Send + Sync;

/// Caller-owned knobs for a single scan: progress sink and cancel flag.
#[derive(Clone, Default)]
pub struct ScanContext {
    progress: Option<Arc<ProgressFn>>,
    cancel: Arc<AtomicBool>,
    /// Start from an empty cache; the file on disk is only replaced once the
    /// scan completes
    ignore_cache: bool,
}

impl ScanContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, progress: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    /// Share an externally owned cancel flag (e.g. set from a signal handler).
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Analyze every file as if no cache existed.
    pub fn ignore_cache(mut self) -> Self {
        self.ignore_cache = true;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn report_progress(&self, processed: usize, total: usize) {
        if let Some(progress) = &self.progress {
            progress(processed, total);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Success,
    /// Outputs were written but at least one error diagnostic was recorded
    Partial,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Candidates after exclusion
    pub discovered: usize,
    /// Files run through an analyzer this scan
    pub analyzed: usize,
    /// Files whose cached record was reused
    pub reused: usize,
    /// Binary-by-extension and oversized files
    pub excluded: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub report: Report,
    pub report_path: PathBuf,
    pub diagnostics: Vec<ScanDiagnostic>,
    pub stats: ScanStats,
    pub status: ScanStatus,
}

/// Scan the whole workspace and rewrite the report and cache.
///
/// Unchanged files (same hash as the cache) reuse their cached record.
pub fn full_scan(
    root: &Path,
    config: &ScanConfig,
    ctx: &ScanContext,
) -> Result<ScanOutcome, ScanError> {
    run(root, config, ctx, Mode::Full)
}

/// Re-analyze one file and re-render the report.
///
/// Every other discovered file reuses its cached record without being read;
/// a file is analyzed only if it has no cached record. `path` may be absolute
/// or relative to `root`.
pub fn single_file_update(
    root: &Path,
    path: &Path,
    config: &ScanConfig,
    ctx: &ScanContext,
) -> Result<ScanOutcome, ScanError> {
    let target = relative_target(root, path);
    run(root, config, ctx, Mode::Single(target))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Full,
    /// Relative path of the file to force
    Single(String),
}

/// What one worker produced for one file.
#[derive(Default)]
struct FileOutcome {
    record: Option<FileRecord>,
    /// New cache entry; `None` leaves the existing entry untouched
    entry: Option<CacheEntry>,
    diagnostics: Vec<ScanDiagnostic>,
    analyzed: bool,
}

/// Shared read-only state for the workers.
struct Worker<'a> {
    cache: &'a IncrementalCache,
    dispatcher: &'a LanguageDispatcher,
    limits: Limits,
    mode: &'a Mode,
    now: i64,
}

fn run(
    root: &Path,
    config: &ScanConfig,
    ctx: &ScanContext,
    mode: Mode,
) -> Result<ScanOutcome, ScanError> {
    if !root.is_dir() || std::fs::read_dir(root).is_err() {
        return Err(ScanError::WorkspaceNotFound(root.to_path_buf()));
    }

    let span = tracing::info_span!("scan", root = %root.display(), full = matches!(mode, Mode::Full));
    let _guard = span.enter();

    let filter = FileFilter::new(root, config);
    let discovery = discover_files(root, &filter);
    let mut diagnostics = discovery.diagnostics;

    let mut cache = if ctx.ignore_cache {
        tracing::info!("ignoring the existing cache");
        IncrementalCache::default()
    } else {
        let (cache, cache_err) = IncrementalCache::load(root);
        if let Some(err) = cache_err {
            tracing::warn!(error = %err, "starting with an empty cache");
            diagnostics.extend(err.to_diagnostic());
        }
        cache
    };
    cache.retain_records_for(&config.analysis_fingerprint());

    let dispatcher = LanguageDispatcher::with_builtin();
    let worker = Worker {
        cache: &cache,
        dispatcher: &dispatcher,
        limits: Limits {
            max_symbols: config.max_symbols,
            max_refs: config.max_refs,
        },
        mode: &mode,
        now: now_millis(),
    };

    let total = discovery.files.len();
    let processed = AtomicUsize::new(0);
    let process = |file: &DiscoveredFile| -> Option<FileOutcome> {
        if ctx.is_cancelled() {
            return None;
        }
        let outcome = worker.process(file);
        let done = processed.fetch_add(1, Ordering::SeqCst) + 1;
        ctx.report_progress(done, total);
        Some(outcome)
    };

    let outcomes: Vec<Option<FileOutcome>> = match rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs)
        .build()
    {
        Ok(pool) => pool.install(|| discovery.files.par_iter().map(process).collect()),
        Err(err) => {
            tracing::warn!(error = %err, "cannot build worker pool; using the global pool");
            discovery.files.par_iter().map(process).collect()
        }
    };

    if ctx.is_cancelled() || outcomes.iter().any(Option::is_none) {
        tracing::info!("scan cancelled; nothing written");
        return Err(ScanError::Cancelled);
    }

    let mut stats = ScanStats {
        discovered: total,
        excluded: discovery.excluded.len(),
        ..ScanStats::default()
    };
    let mut records = Vec::with_capacity(total);
    let mut updates = Vec::new();
    for outcome in outcomes.into_iter().flatten() {
        diagnostics.extend(outcome.diagnostics);
        if let Some(record) = outcome.record {
            if outcome.analyzed {
                stats.analyzed += 1;
            } else {
                stats.reused += 1;
            }
            if let Some(entry) = outcome.entry {
                updates.push((record.path.clone(), entry));
            }
            records.push(record);
        }
    }

    let live: BTreeSet<String> = discovery.files.iter().map(|f| f.rel_path.clone()).collect();
    cache.apply(updates, &live);
    cache.head = if config.enable_git {
        git::head_short(root)
    } else {
        None
    };

    let last_scan = records
        .iter()
        .filter_map(|r| cache.entry(&r.path).map(|e| e.last_scan))
        .max();
    let groups = group::group_files(&records);
    let report = Report::build(ReportInput {
        project: project_name(root),
        head: cache.head.clone(),
        last_scan,
        records,
        groups,
        excluded: &discovery.excluded,
        config,
    });

    let report_path = root.join(&config.report_file);
    write_atomic(&report_path, report::render(&report).as_bytes()).map_err(|source| {
        ScanError::Output {
            path: report_path.clone(),
            source,
        }
    })?;
    cache.save(root)?;

    diagnostics.sort();
    stats.errors = diagnostics.iter().filter(|d| d.is_error()).count();
    let status = if stats.errors > 0 {
        ScanStatus::Partial
    } else {
        ScanStatus::Success
    };

    tracing::info!(
        files = stats.discovered,
        analyzed = stats.analyzed,
        reused = stats.reused,
        errors = stats.errors,
        "scan finished"
    );

    Ok(ScanOutcome {
        report,
        report_path,
        diagnostics,
        stats,
        status,
    })
}

impl Worker<'_> {
    fn process(&self, file: &DiscoveredFile) -> FileOutcome {
        let forced = matches!(self.mode, Mode::Single(target) if *target == file.rel_path);

        // Single-file updates trust every other cached record without reading.
        if matches!(self.mode, Mode::Single(_)) && !forced {
            if let Some(record) = self
                .cache
                .entry(&file.rel_path)
                .and_then(|e| e.record.as_ref())
            {
                return FileOutcome {
                    record: Some(record.clone()),
                    ..FileOutcome::default()
                };
            }
        }

        let bytes = match std::fs::read(&file.path) {
            Ok(bytes) => bytes,
            Err(source) => {
                tracing::warn!(path = %file.rel_path, error = %source, "cannot read file");
                let err = ScanError::FileSystem {
                    path: file.rel_path.clone(),
                    source,
                };
                return FileOutcome {
                    diagnostics: err.to_diagnostic().into_iter().collect(),
                    ..FileOutcome::default()
                };
            }
        };
        let hash = compute_hash(&bytes);

        if !forced {
            if let Some(record) = self.cache.lookup(&file.rel_path, &hash) {
                tracing::trace!(path = %file.rel_path, "unchanged");
                return FileOutcome {
                    record: Some(record.clone()),
                    ..FileOutcome::default()
                };
            }
        }

        let (record, diagnostics) = analyze_file(
            &file.rel_path,
            &bytes,
            hash,
            self.dispatcher,
            self.limits,
        );

        // Same content keeps its timestamp so unchanged trees render identically.
        let last_scan = match self.cache.entry(&file.rel_path) {
            Some(previous) if previous.hash == record.hash => previous.last_scan,
            _ => self.now,
        };
        let entry = CacheEntry {
            hash: record.hash.clone(),
            lang: record.language.clone(),
            last_scan,
            record: Some(record.clone()),
        };

        FileOutcome {
            record: Some(record),
            entry: Some(entry),
            diagnostics,
            analyzed: true,
        }
    }
}

/// Analyze one file's bytes at the per-file error boundary.
///
/// Never fails: malformed content and analyzer panics both yield a record
/// plus a diagnostic.
pub fn analyze_file(
    rel_path: &str,
    bytes: &[u8],
    hash: String,
    dispatcher: &LanguageDispatcher,
    limits: Limits,
) -> (FileRecord, Vec<ScanDiagnostic>) {
    let language = language_tag(rel_path);
    let size = bytes.len() as u64;
    let build = |summary: String, partial: PartialFileRecord, deep: bool| {
        FileRecord::from_partial(
            rel_path.to_string(),
            language.clone(),
            hash.clone(),
            size,
            summary,
            partial,
            deep,
            limits,
        )
    };

    if is_binary(bytes) {
        return (
            build(BINARY_SUMMARY.to_string(), PartialFileRecord::default(), false),
            Vec::new(),
        );
    }

    let content = String::from_utf8_lossy(bytes);
    let deep = importance::is_important(rel_path, &content);
    let analyzer = dispatcher.analyzer_for(&language);

    let result = catch_unwind(AssertUnwindSafe(|| {
        let extracted = if deep {
            analyzer.extract(&content, rel_path)
        } else {
            analyzer.extract_standard(&content, rel_path)
        };
        extracted.map(|partial| {
            let summary = analyzer.summarize(&partial, &content, rel_path);
            (partial, summary)
        })
    }));

    match result {
        Ok(Ok((partial, summary))) => (build(summary, partial, deep), Vec::new()),
        Ok(Err(AnalyzeError::Malformed(reason))) => {
            tracing::debug!(path = rel_path, %reason, "malformed input");
            let summary = format!("could not parse: {}", reason);
            let err = ScanError::MalformedInput {
                path: rel_path.to_string(),
                reason,
            };
            (
                build(summary, PartialFileRecord::default(), deep),
                err.to_diagnostic().into_iter().collect(),
            )
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(path = rel_path, analyzer = analyzer.name(), %message, "analyzer panicked");
            let partial = PartialFileRecord::default();
            let summary = dispatcher.generic().summarize(&partial, &content, rel_path);
            let err = ScanError::AnalyzerFailure {
                path: rel_path.to_string(),
                message,
            };
            (
                build(summary, partial, false),
                err.to_diagnostic().into_iter().collect(),
            )
        }
    }
}

/// A NUL byte in the first 8000 bytes.
pub fn is_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(BINARY_SNIFF_BYTES).any(|&b| b == 0)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "analyzer panicked".to_string()
    }
}

/// Workspace directory name, used as the project name.
fn project_name(root: &Path) -> String {
    std::fs::canonicalize(root)
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| "workspace".to_string())
}

/// `path` relative to `root` with forward slashes; relative input is kept.
fn relative_target(root: &Path, path: &Path) -> String {
    let relative = if path.is_absolute() {
        let canonical_root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        canonical
            .strip_prefix(&canonical_root)
            .or_else(|_| path.strip_prefix(root))
            .map(Path::to_path_buf)
            .unwrap_or(canonical)
    } else {
        path.to_path_buf()
    };
    relative
        .to_string_lossy()
        .replace('\\', "/")
        .trim_start_matches("./")
        .to_string()
}
