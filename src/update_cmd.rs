//! Update command implementation

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

use codemap::validation::{has_suspicious_traversal, relative_to_root};
use codemap::{single_file_update, ScanError};

pub fn run_update(root: PathBuf, file: PathBuf, verbose: bool) -> Result<u8> {
    if !root.is_dir() {
        return Err(ScanError::WorkspaceNotFound(root).into());
    }
    let config = crate::load_config(&root)?;
    let target = update_target(&root, &file)?;

    let progress = crate::scan_cmd::progress_bar(verbose);
    let ctx = crate::scan_cmd::scan_context(progress.clone())?;
    let outcome = single_file_update(&root, Path::new(&target), &config, &ctx);
    progress.finish_and_clear();
    let outcome = outcome?;

    crate::print_diagnostics(&outcome.diagnostics, verbose);
    crate::print_summary(&outcome);
    Ok(crate::exit_code(&outcome))
}

/// Root-relative path of the file to update.
///
/// An existing file must resolve inside the root. A vanished file is taken as
/// given so the update prunes it from the report.
fn update_target(root: &Path, file: &Path) -> Result<String> {
    if file.exists() {
        return Ok(relative_to_root(&std::fs::canonicalize(file)?, root)?);
    }
    if root.join(file).exists() {
        return Ok(relative_to_root(file, root)?);
    }

    let text = file.to_string_lossy();
    if file.is_absolute() || has_suspicious_traversal(&text) || text.contains("..") {
        bail!("{} does not exist inside {}", file.display(), root.display());
    }
    Ok(text.replace('\\', "/").trim_start_matches("./").to_string())
}
