//! Watch command implementation

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use codemap::{
    full_scan, single_file_update, FileFilter, FileSystemWatcher, ScanConfig, ScanContext,
    ScanError, ScanOutcome, WatcherBatch, WatcherConfig,
};

pub fn run_watch(root_path: PathBuf, debounce_ms: Option<u64>, verbose: bool) -> Result<u8> {
    let mut config = crate::load_config(&root_path)?;
    if let Some(ms) = debounce_ms {
        config.debounce_ms = ms;
    }

    // Shared by the signal handlers, the watcher thread and every scan
    let shutdown = Arc::new(AtomicBool::new(false));

    #[cfg(unix)]
    {
        use signal_hook::consts::signal;
        use signal_hook::iterator::Signals;

        let shutdown_clone = shutdown.clone();
        let mut signals = Signals::new([signal::SIGTERM, signal::SIGINT])?;
        std::thread::spawn(move || {
            if signals.forever().next().is_some() {
                shutdown_clone.store(true, Ordering::SeqCst);
            }
        });
    }

    let ctx = ScanContext::new().with_cancel_flag(shutdown.clone());

    let outcome = full_scan(&root_path, &config, &ctx)?;
    report(&outcome, verbose);

    let watcher = FileSystemWatcher::new(
        WatcherConfig::from_scan_config(&root_path, &config),
        FileFilter::new(&root_path, &config),
        shutdown.clone(),
    )?;
    println!("Codemap watching: {}", root_path.display());

    while !shutdown.load(Ordering::SeqCst) {
        let batch = match watcher.recv_batch_timeout(Duration::from_millis(250)) {
            Ok(Some(batch)) => batch,
            Ok(None) => break,
            Err(()) => continue,
        };

        match rescan(&root_path, &config, &ctx, &batch) {
            Ok(outcome) => report(&outcome, verbose),
            Err(ScanError::Cancelled) => break,
            Err(err) => tracing::error!(error = %err, "rescan failed"),
        }
    }

    shutdown.store(true, Ordering::SeqCst);
    watcher.shutdown();
    println!("SHUTDOWN");
    Ok(0)
}

/// One existing changed file is updated on its own; anything else, including
/// a deletion, gets a full scan.
fn rescan(
    root: &Path,
    config: &ScanConfig,
    ctx: &ScanContext,
    batch: &WatcherBatch,
) -> Result<ScanOutcome, ScanError> {
    match batch.single() {
        Some(path) if root.join(path).is_file() => {
            tracing::info!(path, "file changed");
            single_file_update(root, Path::new(path), config, ctx)
        }
        _ => {
            tracing::info!(count = batch.paths.len(), "files changed");
            full_scan(root, config, ctx)
        }
    }
}

fn report(outcome: &ScanOutcome, verbose: bool) {
    crate::print_diagnostics(&outcome.diagnostics, verbose);
    crate::print_summary(outcome);
}
