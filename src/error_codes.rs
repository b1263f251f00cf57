//! Stable error codes attached to scan diagnostics
//!
//! Error codes follow the pattern: CM-{CATEGORY}-{3-digit number}
//!
//! Categories (1-3 uppercase letters):
//! - IO: filesystem access (unreadable files or directories, write failures)
//! - IN: malformed input content (e.g. invalid JSON)
//! - AN: analyzer failures caught at the per-file boundary
//! - C: cache problems (corrupt or unreadable cache file)
//! - WS: workspace-level failures
//!
//! Each error code is stable and should not be reused.

/// File or directory could not be read
pub const CM_IO_001_READ_FAILED: &str = "CM-IO-001";

/// Directory could not be listed during discovery
pub const CM_IO_002_WALK_FAILED: &str = "CM-IO-002";

/// Report or cache could not be written
pub const CM_IO_003_WRITE_FAILED: &str = "CM-IO-003";

/// File content could not be parsed by its analyzer
pub const CM_IN_001_MALFORMED: &str = "CM-IN-001";

/// Analyzer panicked or failed unexpectedly
pub const CM_AN_001_ANALYZER_FAILED: &str = "CM-AN-001";

/// Cache file corrupt or unparsable; discarded
pub const CM_C_001_CACHE_CORRUPT: &str = "CM-C-001";

/// Workspace root missing or unreadable
pub const CM_WS_001_ROOT_NOT_FOUND: &str = "CM-WS-001";

/// Scan cancelled before completion; nothing written
pub const CM_WS_002_CANCELLED: &str = "CM-WS-002";

/// Error code documentation
///
/// | Code | Description | Remediation |
/// |------|-------------|-------------|
/// | CM-IO-001 | File could not be read | Check file permissions |
/// | CM-IO-002 | Directory could not be listed | Check directory permissions; siblings are still scanned |
/// | CM-IO-003 | Report or cache write failed | Check that the workspace root is writable |
/// | CM-IN-001 | Malformed input | Fix the file; it is reported with a "could not parse" summary |
/// | CM-AN-001 | Analyzer failure | File gets an empty record; report the input that triggered it |
/// | CM-C-001 | Cache corrupt | None needed; the cache is rebuilt on the next scan |
/// | CM-WS-001 | Workspace not found | Pass an existing directory as the root |
/// | CM-WS-002 | Scan cancelled | Re-run the scan |
pub const ERROR_CODE_DOCUMENTATION: &str = "Error code documentation available in source";
