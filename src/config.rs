//! Scan configuration.
//!
//! The engine only ever receives a [`ScanConfig`] value. Loading it from disk
//! is a convenience for the CLI: `codemap.toml` at the workspace root, or
//! `.codemap/config.toml`, whichever exists first. Missing keys take their
//! defaults.
//!
//! ```toml
//! max-file-kb = 800
//! max-symbols = 150
//! extra-ignore-globs = ["fixtures/**", "*.snap"]
//! emit-symbols = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file locations, relative to the workspace root, in lookup order.
pub const CONFIG_FILE_NAMES: &[&str] = &["codemap.toml", ".codemap/config.toml"];

/// Default report file name, written at the workspace root.
pub const DEFAULT_REPORT_FILE: &str = "CODEMAP.md";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Options recognized by the scan engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScanConfig {
    /// Files larger than this many KiB are never read
    pub max_file_kb: u64,
    /// Symbol cap per file; extra matches set `truncated`
    pub max_symbols: usize,
    /// Reference cap per file; extra references set `truncated`
    pub max_refs: usize,
    /// Extra glob patterns (relative to root) to exclude
    pub extra_ignore_globs: Vec<String>,
    /// Honour `.gitignore` files under the root
    pub respect_gitignore: bool,
    /// Emit per-file route lines
    pub emit_routes: bool,
    /// Emit per-file schema lines
    pub emit_schemas: bool,
    /// Emit per-file symbol lists
    pub emit_symbols: bool,
    /// Quiet period for the watch loop; the engine itself never waits
    pub debounce_ms: u64,
    /// Worker threads for hashing and analysis; 0 means one per core
    pub jobs: usize,
    /// Record the git HEAD in the cache and report header
    pub enable_git: bool,
    /// Show excluded (binary / oversized) files in the overview totals
    pub count_excluded_bytes: bool,
    /// Report file name at the workspace root
    pub report_file: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_file_kb: 800,
            max_symbols: 150,
            max_refs: 50,
            extra_ignore_globs: Vec::new(),
            respect_gitignore: true,
            emit_routes: true,
            emit_schemas: true,
            emit_symbols: true,
            debounce_ms: 750,
            jobs: 0,
            enable_git: true,
            count_excluded_bytes: false,
            report_file: DEFAULT_REPORT_FILE.to_string(),
        }
    }
}

impl ScanConfig {
    /// Load configuration for a workspace.
    ///
    /// # Returns
    /// Defaults when no config file exists; an error only when a file exists
    /// but cannot be read or parsed.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        for name in CONFIG_FILE_NAMES {
            let path = root.join(name);
            if !path.is_file() {
                continue;
            }
            let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            let config = Self::from_toml_str(&text)
                .map_err(|source| ConfigError::Parse { path, source })?;
            tracing::debug!(file = name, "loaded config");
            return Ok(config);
        }
        Ok(Self::default())
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Size cap in bytes.
    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_kb.saturating_mul(1024)
    }

    /// Identifies everything that shapes a cached record.
    ///
    /// Cached records produced under a different fingerprint are discarded.
    pub fn analysis_fingerprint(&self) -> String {
        format!(
            "{}:{}:{}",
            env!("CARGO_PKG_VERSION"),
            self.max_symbols,
            self.max_refs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.max_file_kb, 800);
        assert_eq!(config.max_symbols, 150);
        assert_eq!(config.max_refs, 50);
        assert!(config.respect_gitignore);
        assert_eq!(config.debounce_ms, 750);
        assert_eq!(config.report_file, "CODEMAP.md");
        assert_eq!(config.max_file_bytes(), 800 * 1024);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ScanConfig::from_toml_str(
            "max-symbols = 20\nextra-ignore-globs = [\"fixtures/**\"]\nemit-routes = false\n",
        )
        .unwrap();
        assert_eq!(config.max_symbols, 20);
        assert_eq!(config.extra_ignore_globs, vec!["fixtures/**".to_string()]);
        assert!(!config.emit_routes);
        assert_eq!(config.max_refs, 50);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        assert_eq!(ScanConfig::load(temp.path()).unwrap(), ScanConfig::default());
    }

    #[test]
    fn test_load_from_hidden_dir() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join(".codemap")).unwrap();
        std::fs::write(temp.path().join(".codemap/config.toml"), "jobs = 2\n").unwrap();

        let config = ScanConfig::load(temp.path()).unwrap();
        assert_eq!(config.jobs, 2);
    }

    #[test]
    fn test_load_invalid_file_is_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("codemap.toml"), "max-symbols = \"many\"\n").unwrap();

        let err = ScanConfig::load(temp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_fingerprint_tracks_caps() {
        let a = ScanConfig::default();
        let b = ScanConfig {
            max_symbols: 10,
            ..ScanConfig::default()
        };
        assert_ne!(a.analysis_fingerprint(), b.analysis_fingerprint());
    }
}
