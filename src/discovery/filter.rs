//! Exclusion rules for discovery and the watch loop.
//!
//! Checks run in a fixed precedence order so the same inputs always produce
//! the same skip reason:
//! 1. Fixed directory exclusions (.git/, node_modules/, build output, ...)
//! 2. Generated artifacts (the report file, the `.codemap/` directory)
//! 3. Gitignore rules (.gitignore, .ignore at the root)
//! 4. Extra ignore globs from the config
//! 5. Binary extension denylist
//! 6. Size cap
//!
//! Everything here decides from the path and metadata alone; no file content
//! is read.

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Component, Path, PathBuf};

use crate::cache::CACHE_DIR;
use crate::config::ScanConfig;
use crate::diagnostics::SkipReason;

/// Directory basenames that are never descended into.
pub const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    "bower_components",
    ".vscode",
    ".idea",
    "dist",
    "build",
    "target",
    "out",
    ".venv",
    "venv",
    "env",
    "__pycache__",
    ".next",
    ".cache",
    "coverage",
    CACHE_DIR,
];

/// Extensions excluded before any read.
///
/// Image formats that commonly live in asset folders (jpeg, svg, webp, ico,
/// bmp) are deliberately absent so the grouper can summarize those folders.
pub const BINARY_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "bin", "o", "a", "class", "jar", "wasm", "pyc", "zip", "tar",
    "gz", "tgz", "7z", "rar", "jpg", "png", "gif", "pdf", "woff", "woff2", "ttf", "mp3", "mp4",
    "db", "sqlite",
];

/// Exclusion state for one workspace root.
pub struct FileFilter {
    /// Root as given by the caller (discovery strips this prefix)
    root: PathBuf,
    /// Canonical root (watch events arrive as canonical paths)
    canonical_root: PathBuf,
    gitignore: Option<Gitignore>,
    extra_globs: GlobSet,
    max_file_bytes: u64,
    report_file: String,
}

impl FileFilter {
    /// Create a filter for the given root directory.
    ///
    /// Invalid globs and unreadable ignore files are logged and left out;
    /// they never fail the scan.
    pub fn new(root: &Path, config: &ScanConfig) -> Self {
        let canonical_root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());

        let gitignore = if config.respect_gitignore {
            Self::load_gitignore(root)
        } else {
            None
        };

        Self {
            root: root.to_path_buf(),
            canonical_root,
            gitignore,
            extra_globs: Self::compile_globs(&config.extra_ignore_globs),
            max_file_bytes: config.max_file_bytes(),
            report_file: config.report_file.clone(),
        }
    }

    /// Load gitignore-style rules from .gitignore and .ignore files.
    fn load_gitignore(root: &Path) -> Option<Gitignore> {
        let mut builder = GitignoreBuilder::new(root);

        for name in [".gitignore", ".ignore"] {
            let path = root.join(name);
            if path.exists() {
                if let Some(err) = builder.add(&path) {
                    tracing::warn!(file = name, error = %err, "failed to load ignore file");
                }
            }
        }

        match builder.build() {
            Ok(gitignore) => Some(gitignore),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring malformed gitignore rules");
                None
            }
        }
    }

    fn compile_globs(patterns: &[String]) -> GlobSet {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(err) => {
                    tracing::warn!(pattern = %pattern, error = %err, "skipping invalid ignore glob");
                }
            }
        }
        builder.build().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "ignore globs disabled");
            GlobSet::empty()
        })
    }

    /// Decide whether a directory is pruned.
    ///
    /// # Arguments
    /// * `rel_path` - Directory path relative to root, forward slashes
    pub fn skip_dir(&self, rel_path: &str) -> Option<SkipReason> {
        let name = rel_path.rsplit('/').next().unwrap_or(rel_path);
        if EXCLUDED_DIRS.contains(&name) {
            return Some(SkipReason::ExcludedDirectory);
        }
        if self.is_gitignored(rel_path, true) {
            return Some(SkipReason::IgnoredByGitignore);
        }
        if self.extra_globs.is_match(rel_path) {
            return Some(SkipReason::ExcludedByGlob);
        }
        None
    }

    /// Decide whether a regular file is excluded.
    ///
    /// Ancestor directories are assumed to have passed [`skip_dir`](Self::skip_dir).
    pub fn skip_file(&self, rel_path: &str, size: u64) -> Option<SkipReason> {
        if rel_path == self.report_file {
            return Some(SkipReason::GeneratedArtifact);
        }
        if self.is_gitignored(rel_path, false) {
            return Some(SkipReason::IgnoredByGitignore);
        }
        if self.extra_globs.is_match(rel_path) {
            return Some(SkipReason::ExcludedByGlob);
        }
        if has_binary_extension(rel_path) {
            return Some(SkipReason::BinaryExtension);
        }
        if size > self.max_file_bytes {
            return Some(SkipReason::TooLarge);
        }
        None
    }

    /// Full check for an arbitrary path, including all of its ancestors.
    ///
    /// Used for paths that did not come from a tree walk (watch events,
    /// single-file updates).
    ///
    /// # Returns
    /// * `None` - Path should be processed
    /// * `Some(reason)` - Path should be skipped
    pub fn should_skip(&self, path: &Path) -> Option<SkipReason> {
        let metadata = match std::fs::symlink_metadata(path) {
            Ok(m) if m.is_file() => m,
            _ => return Some(SkipReason::NotAFile),
        };

        let rel_path = self.relative_path(path);
        let mut prefix = String::new();
        let components: Vec<&str> = rel_path.split('/').collect();
        for dir in &components[..components.len().saturating_sub(1)] {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(dir);
            if let Some(reason) = self.skip_dir(&prefix) {
                return Some(reason);
            }
        }

        self.skip_file(&rel_path, metadata.len())
    }

    fn is_gitignored(&self, rel_path: &str, is_dir: bool) -> bool {
        match self.gitignore {
            Some(ref gitignore) => gitignore.matched(Path::new(rel_path), is_dir).is_ignore(),
            None => false,
        }
    }

    /// Get path relative to root, with forward slashes.
    pub fn relative_path(&self, path: &Path) -> String {
        let rel = path
            .strip_prefix(&self.root)
            .or_else(|_| path.strip_prefix(&self.canonical_root))
            .unwrap_or(path);

        rel.components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Whether the path's extension is on the binary denylist.
pub fn has_binary_extension(rel_path: &str) -> bool {
    extension_of(rel_path)
        .map(|ext| BINARY_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Lowercase extension of a path string, without the dot.
///
/// Dotfiles like `.env` have no extension.
pub fn extension_of(path: &str) -> Option<String> {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(name[idx + 1..].to_ascii_lowercase()),
    }
}
