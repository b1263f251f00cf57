//! Codemap: a deterministic source-tree map for readers and language models.
//!
//! Codemap walks a workspace, extracts a compact record per file (summary,
//! symbols, routes, schemas, imports, framework detectors), groups bulk
//! directories, and renders everything as one Markdown report at the root
//! (`CODEMAP.md` by default).
//!
//! # Determinism
//!
//! Two scans of an unchanged tree produce byte-identical reports:
//! - Discovery visits siblings in lexicographic order
//! - Per-file analysis depends only on file content and the scan settings
//! - Report sections are sorted, never in completion order of workers
//! - The `last_scan` timestamp is carried in the cache and only moves when a
//!   file's content changes
//!
//! # Incremental scans
//!
//! `.codemap/index.json` keeps, per relative path, the SHA-256 of the content
//! and the record computed for it. Unchanged files are never re-analyzed.
//! [`single_file_update`] re-analyzes one file and reuses every other record
//! without reading it.
//!
//! # Position conventions
//!
//! Symbol, route and schema lines are 1-indexed.

pub mod analyze;
pub mod cache;
pub mod config;
pub mod describe;
pub mod diagnostics;
pub mod discovery;
pub mod error;
pub mod error_codes;
pub mod git;
pub mod group;
pub mod hash;
pub mod importance;
pub mod model;
pub mod report;
pub mod scan;
pub mod validation;
pub mod verify;
pub mod version;
pub mod watcher;

pub use analyze::{AnalyzeError, Analyzer, LanguageDispatcher, LanguageFamily};
pub use cache::{CacheEntry, IncrementalCache};
pub use config::{ConfigError, ScanConfig};
pub use diagnostics::{DiagnosticStage, ScanDiagnostic, SkipReason};
pub use discovery::{discover_files, FileFilter};
pub use error::ScanError;
pub use group::group_files;
pub use hash::compute_hash;
pub use model::{
    ExportRecord, FileGroup, FileRecord, GroupKind, ImportRecord, RouteRecord, SchemaField,
    SchemaKind, SchemaRecord, SchemaRelation, SymbolKind, SymbolRecord,
};
pub use report::{render, Report};
pub use scan::{
    analyze_file, full_scan, single_file_update, ScanContext, ScanOutcome, ScanStats, ScanStatus,
};
pub use validation::{validate_path_within_root, PathValidationError};
pub use verify::{verify_cache, VerifyReport};
pub use watcher::{FileSystemWatcher, WatcherBatch, WatcherConfig};
