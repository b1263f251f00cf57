//! Structured diagnostics for scan operations.
//!
//! Provides deterministic, sortable diagnostic types for skip reasons and
//! per-file errors. Diagnostics never abort a scan; they are collected,
//! sorted and handed back to the caller alongside the report.

pub mod scan_diagnostics;

pub use scan_diagnostics::{DiagnosticStage, ScanDiagnostic, SkipReason};
