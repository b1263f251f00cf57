//! Error taxonomy for the scan engine.
//!
//! Only [`ScanError::WorkspaceNotFound`], [`ScanError::Cancelled`] and
//! [`ScanError::Output`] are ever returned from the entry points. The other
//! variants describe per-file failures; the engine records them as
//! [`ScanDiagnostic`]s and keeps going.

use std::path::PathBuf;

use crate::diagnostics::{DiagnosticStage, ScanDiagnostic};
use crate::error_codes::*;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Root path does not exist, is not a directory, or cannot be read
    #[error("workspace root not found or unreadable: {0}")]
    WorkspaceNotFound(PathBuf),

    /// A file or directory inside the tree could not be read
    #[error("cannot read {path}: {source}")]
    FileSystem {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// File content is not valid for its language (e.g. invalid JSON)
    #[error("could not parse {path}: {reason}")]
    MalformedInput { path: String, reason: String },

    /// An analyzer failed unexpectedly on a single file
    #[error("analyzer failed on {path}: {message}")]
    AnalyzerFailure { path: String, message: String },

    /// Cache file was unparsable and has been discarded
    #[error("cache at {path} is corrupt: {reason}")]
    CacheCorruption { path: PathBuf, reason: String },

    /// Cancellation flag was raised before the scan finished
    #[error("scan cancelled")]
    Cancelled,

    /// Report or cache could not be written
    #[error("failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Stable error code for this failure class.
    pub fn code(&self) -> &'static str {
        match self {
            ScanError::WorkspaceNotFound(_) => CM_WS_001_ROOT_NOT_FOUND,
            ScanError::FileSystem { .. } => CM_IO_001_READ_FAILED,
            ScanError::MalformedInput { .. } => CM_IN_001_MALFORMED,
            ScanError::AnalyzerFailure { .. } => CM_AN_001_ANALYZER_FAILED,
            ScanError::CacheCorruption { .. } => CM_C_001_CACHE_CORRUPT,
            ScanError::Cancelled => CM_WS_002_CANCELLED,
            ScanError::Output { .. } => CM_IO_003_WRITE_FAILED,
        }
    }

    /// Convert a non-fatal error into a diagnostic, if it is one.
    pub fn to_diagnostic(&self) -> Option<ScanDiagnostic> {
        let (path, stage, message) = match self {
            ScanError::FileSystem { path, source } => {
                (path.clone(), DiagnosticStage::Read, source.to_string())
            }
            ScanError::MalformedInput { path, reason } => {
                (path.clone(), DiagnosticStage::Parse, reason.clone())
            }
            ScanError::AnalyzerFailure { path, message } => {
                (path.clone(), DiagnosticStage::Analyze, message.clone())
            }
            ScanError::CacheCorruption { path, reason } => (
                path.to_string_lossy().to_string(),
                DiagnosticStage::Cache,
                reason.clone(),
            ),
            _ => return None,
        };
        Some(ScanDiagnostic::error(path, stage, self.code(), message))
    }

    /// Whether this error aborts the scan.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::WorkspaceNotFound(_) | ScanError::Cancelled | ScanError::Output { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ScanError::WorkspaceNotFound(PathBuf::from("/nope")).is_fatal());
        assert!(ScanError::Cancelled.is_fatal());
        assert!(!ScanError::MalformedInput {
            path: "a.json".into(),
            reason: "eof".into()
        }
        .is_fatal());
    }

    #[test]
    fn test_non_fatal_errors_become_diagnostics() {
        let err = ScanError::MalformedInput {
            path: "package.json".into(),
            reason: "expected value".into(),
        };
        let diag = err.to_diagnostic().expect("malformed input is a diagnostic");
        assert_eq!(diag.path(), "package.json");
        assert!(diag.is_error());
        assert_eq!(err.code(), "CM-IN-001");

        assert!(ScanError::Cancelled.to_diagnostic().is_none());
    }
}
