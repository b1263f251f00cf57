//! Scan command implementation

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;

use codemap::{full_scan, ScanContext};

use crate::ScanArgs;

pub fn run_scan(args: ScanArgs, verbose: bool) -> Result<u8> {
    let root = args.root;
    let mut config = crate::load_config(&root)?;
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }

    let progress = progress_bar(verbose);
    let mut ctx = scan_context(progress.clone())?;
    if args.no_cache {
        ctx = ctx.ignore_cache();
    }

    let outcome = full_scan(&root, &config, &ctx);
    progress.finish_and_clear();
    let outcome = outcome?;

    crate::print_diagnostics(&outcome.diagnostics, verbose);
    if args.json {
        crate::output_json(&outcome)?;
    } else {
        crate::print_summary(&outcome);
    }

    Ok(crate::exit_code(&outcome))
}

/// Progress bar on an interactive stderr; hidden otherwise and in verbose
/// mode, where log lines would interleave with it.
pub fn progress_bar(verbose: bool) -> ProgressBar {
    if verbose || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(0);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        bar.set_style(style.progress_chars("█▓▒░  "));
    }
    bar.set_message("scanning");
    bar
}

/// Context wired to `bar`, cancelled on SIGINT/SIGTERM.
pub fn scan_context(bar: ProgressBar) -> Result<ScanContext> {
    let ctx = ScanContext::new().with_progress(move |done, total| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
    });

    #[cfg(unix)]
    {
        use signal_hook::consts::signal;
        for sig in [signal::SIGINT, signal::SIGTERM] {
            signal_hook::flag::register(sig, ctx.cancel_flag())
                .context("registering signal handler")?;
        }
    }

    Ok(ctx)
}
