//! Scan diagnostics for structured skip reasons and error reporting.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Reason why a path was left out of the scan.
///
/// Each variant represents a deterministic decision point in the discovery
/// pipeline. The order of variants matters for precedence when reporting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Directory basename is in the fixed exclusion set (.git, node_modules, ...)
    ExcludedDirectory,
    /// Matched by .gitignore rules
    IgnoredByGitignore,
    /// Matched by a configured extra ignore glob
    ExcludedByGlob,
    /// Extension is on the binary denylist
    BinaryExtension,
    /// File is above the configured size cap
    TooLarge,
    /// File is produced by codemap itself (the report)
    GeneratedArtifact,
    /// Not a regular file (symlink, socket, ...)
    NotAFile,
}

impl SkipReason {
    /// Stable sort key for deterministic ordering.
    ///
    /// Lower values = higher priority in reporting.
    pub fn sort_key(&self) -> u8 {
        match self {
            SkipReason::ExcludedDirectory => 0,
            SkipReason::IgnoredByGitignore => 1,
            SkipReason::ExcludedByGlob => 2,
            SkipReason::BinaryExtension => 3,
            SkipReason::TooLarge => 4,
            SkipReason::GeneratedArtifact => 5,
            SkipReason::NotAFile => 6,
        }
    }

    /// Human-readable description for stderr output.
    pub fn description(&self) -> &'static str {
        match self {
            SkipReason::ExcludedDirectory => "excluded directory",
            SkipReason::IgnoredByGitignore => "matched by gitignore",
            SkipReason::ExcludedByGlob => "excluded by pattern",
            SkipReason::BinaryExtension => "binary extension",
            SkipReason::TooLarge => "above size limit",
            SkipReason::GeneratedArtifact => "generated by codemap",
            SkipReason::NotAFile => "not a regular file",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl PartialOrd for SkipReason {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SkipReason {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Stage in the scan pipeline where an error occurred.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticStage {
    /// Failed to list a directory
    Discover,
    /// Failed to read file from filesystem
    Read,
    /// Content could not be parsed (malformed input)
    Parse,
    /// Analyzer failed unexpectedly
    Analyze,
    /// Cache could not be loaded or saved
    Cache,
    /// Report could not be written
    Emit,
}

impl DiagnosticStage {
    /// Stable sort key for deterministic ordering.
    pub fn sort_key(&self) -> u8 {
        match self {
            DiagnosticStage::Discover => 0,
            DiagnosticStage::Read => 1,
            DiagnosticStage::Parse => 2,
            DiagnosticStage::Analyze => 3,
            DiagnosticStage::Cache => 4,
            DiagnosticStage::Emit => 5,
        }
    }

    /// Human-readable description for stderr output.
    pub fn description(&self) -> &'static str {
        match self {
            DiagnosticStage::Discover => "listing directory",
            DiagnosticStage::Read => "reading file",
            DiagnosticStage::Parse => "parsing content",
            DiagnosticStage::Analyze => "analyzing file",
            DiagnosticStage::Cache => "loading cache",
            DiagnosticStage::Emit => "writing output",
        }
    }
}

impl fmt::Display for DiagnosticStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl PartialOrd for DiagnosticStage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DiagnosticStage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// A diagnostic event from the scan pipeline.
///
/// Represents either a skipped path or a non-fatal processing error.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanDiagnostic {
    /// Path was skipped during discovery
    Skipped {
        /// Path relative to root
        path: String,
        /// Why the path was skipped
        reason: SkipReason,
    },
    /// Error occurred while processing a path
    Error {
        /// Path relative to root
        path: String,
        /// Pipeline stage where error occurred
        stage: DiagnosticStage,
        /// Stable error code (see `error_codes`)
        code: &'static str,
        /// Error message
        message: String,
    },
}

impl ScanDiagnostic {
    /// Get the path for this diagnostic.
    pub fn path(&self) -> &str {
        match self {
            ScanDiagnostic::Skipped { path, .. } => path,
            ScanDiagnostic::Error { path, .. } => path,
        }
    }

    /// Stable sort key for deterministic ordering.
    ///
    /// Primary: path string (lexicographic)
    /// Secondary: variant type (Error before Skipped)
    /// Tertiary: stage/reason sort key
    pub fn sort_key(&self) -> (&str, u8, u8) {
        match self {
            ScanDiagnostic::Error { path, stage, .. } => (path, 0, stage.sort_key()),
            ScanDiagnostic::Skipped { path, reason } => (path, 1, reason.sort_key()),
        }
    }

    /// Create a Skipped diagnostic.
    pub fn skipped(path: impl Into<String>, reason: SkipReason) -> Self {
        ScanDiagnostic::Skipped {
            path: path.into(),
            reason,
        }
    }

    /// Create an Error diagnostic.
    pub fn error(
        path: impl Into<String>,
        stage: DiagnosticStage,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        ScanDiagnostic::Error {
            path: path.into(),
            stage,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ScanDiagnostic::Error { .. })
    }

    /// Format for human-readable stderr output.
    ///
    /// Examples:
    /// - "SKIP node_modules: excluded directory"
    /// - "ERROR package.json: parsing content: expected value at line 1 column 1"
    pub fn format_stderr(&self) -> String {
        match self {
            ScanDiagnostic::Skipped { path, reason } => {
                format!("SKIP {}: {}", path, reason)
            }
            ScanDiagnostic::Error {
                path,
                stage,
                message,
                ..
            } => {
                format!("ERROR {}: {}: {}", path, stage, message)
            }
        }
    }
}

impl fmt::Display for ScanDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_stderr())
    }
}

impl PartialOrd for ScanDiagnostic {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScanDiagnostic {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_codes::{CM_IN_001_MALFORMED, CM_IO_001_READ_FAILED};

    #[test]
    fn test_skip_reason_ord() {
        assert!(SkipReason::ExcludedDirectory < SkipReason::IgnoredByGitignore);
        assert!(SkipReason::IgnoredByGitignore < SkipReason::ExcludedByGlob);
        assert!(SkipReason::BinaryExtension < SkipReason::TooLarge);
    }

    #[test]
    fn test_diagnostic_stage_ord() {
        assert!(DiagnosticStage::Discover < DiagnosticStage::Read);
        assert!(DiagnosticStage::Read < DiagnosticStage::Parse);
        assert_eq!(DiagnosticStage::Emit.sort_key(), 5);
    }

    #[test]
    fn test_error_sorts_before_skip_on_same_path() {
        let error = ScanDiagnostic::error(
            "src/a.ts",
            DiagnosticStage::Read,
            CM_IO_001_READ_FAILED,
            "denied",
        );
        let skipped = ScanDiagnostic::skipped("src/a.ts", SkipReason::TooLarge);

        assert_eq!(error.sort_key().0, skipped.sort_key().0);
        assert!(error < skipped);
        assert!(error.is_error());
        assert!(!skipped.is_error());
    }

    #[test]
    fn test_sorting_is_path_primary() {
        let mut diagnostics = vec![
            ScanDiagnostic::skipped("src/c.png", SkipReason::BinaryExtension),
            ScanDiagnostic::error(
                "src/a.json",
                DiagnosticStage::Parse,
                CM_IN_001_MALFORMED,
                "eof",
            ),
            ScanDiagnostic::skipped("src/b.zip", SkipReason::TooLarge),
        ];

        diagnostics.sort();

        assert_eq!(diagnostics[0].path(), "src/a.json");
        assert_eq!(diagnostics[1].path(), "src/b.zip");
        assert_eq!(diagnostics[2].path(), "src/c.png");
    }

    #[test]
    fn test_format_stderr() {
        let skip = ScanDiagnostic::skipped("node_modules", SkipReason::ExcludedDirectory);
        assert_eq!(skip.format_stderr(), "SKIP node_modules: excluded directory");

        let err = ScanDiagnostic::error(
            "package.json",
            DiagnosticStage::Parse,
            CM_IN_001_MALFORMED,
            "trailing comma",
        );
        assert_eq!(
            err.to_string(),
            "ERROR package.json: parsing content: trailing comma"
        );
    }
}
