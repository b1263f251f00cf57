//! Codemap CLI - deterministic source-tree map
//!
//! Usage: codemap <command> [arguments]

mod scan_cmd;
mod update_cmd;
mod verify_cmd;
mod watch_cmd;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use codemap::{ScanConfig, ScanDiagnostic, ScanError, ScanOutcome};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Exit code for a scan that finished with errors (partial report written)
pub const EXIT_SCAN_ERROR: u8 = 1;
/// Exit code when the workspace root is missing or unreadable
pub const EXIT_WORKSPACE_NOT_FOUND: u8 = 2;

/// Map a source tree into one Markdown report.
///
/// Examples:
///   codemap scan                 # Scan the current directory
///   codemap scan ../api --json   # Scan another tree, print the outcome as JSON
///   codemap update src/app.ts    # Re-analyze one file
///   codemap watch                # Keep the report current while editing
#[derive(Parser, Debug)]
#[command(name = "codemap")]
#[command(version)]
#[command(about, long_about = None)]
struct Cli {
    /// Log progress and per-stage information to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the whole tree and rewrite the report
    Scan(ScanArgs),
    /// Re-analyze a single file and re-render the report
    Update {
        /// File to re-analyze (absolute, or relative to the current directory)
        file: PathBuf,
        /// Workspace root
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
    },
    /// Compare the cache against the filesystem
    Verify {
        #[arg(default_value = ".")]
        root: PathBuf,
        /// Exit with code 1 when anything changed since the last scan
        #[arg(long)]
        fail_if_stale: bool,
        /// Print the verification report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Scan, then rescan on every change until interrupted
    Watch {
        #[arg(default_value = ".")]
        root: PathBuf,
        /// Debounce window in milliseconds (overrides the config file)
        #[arg(long)]
        debounce_ms: Option<u64>,
    },
    /// Print version and build information
    Version,
}

#[derive(Args, Debug)]
struct ScanArgs {
    #[arg(default_value = ".")]
    root: PathBuf,
    /// Worker threads (0 = one per core)
    #[arg(short, long)]
    jobs: Option<usize>,
    /// Print the scan outcome as JSON on stdout
    #[arg(long)]
    json: bool,
    /// Re-analyze every file; the cache is rewritten only when the scan completes
    #[arg(long)]
    no_cache: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Scan(args) => scan_cmd::run_scan(args, cli.verbose),
        Command::Update { file, root } => update_cmd::run_update(root, file, cli.verbose),
        Command::Verify {
            root,
            fail_if_stale,
            json,
        } => verify_cmd::run_verify(root, fail_if_stale, json),
        Command::Watch { root, debounce_ms } => watch_cmd::run_watch(root, debounce_ms, cli.verbose),
        Command::Version => {
            println!("{}", codemap::version::version());
            Ok(0)
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            match err.downcast_ref::<ScanError>() {
                Some(ScanError::WorkspaceNotFound(_)) => ExitCode::from(EXIT_WORKSPACE_NOT_FOUND),
                _ => ExitCode::from(EXIT_SCAN_ERROR),
            }
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();
}

/// Load `<root>/codemap.toml` (or `.codemap/config.toml`).
pub fn load_config(root: &Path) -> Result<ScanConfig> {
    ScanConfig::load(root).with_context(|| format!("loading config for {}", root.display()))
}

/// Errors always; skips only when verbose.
pub fn print_diagnostics(diagnostics: &[ScanDiagnostic], verbose: bool) {
    for diagnostic in diagnostics {
        if verbose || diagnostic.is_error() {
            eprintln!("{}", diagnostic.format_stderr());
        }
    }
}

/// One-line human summary of a finished scan.
pub fn print_summary(outcome: &ScanOutcome) {
    let stats = &outcome.stats;
    println!(
        "Wrote {}: {} files ({} analyzed, {} reused, {} excluded, {} errors)",
        outcome.report_path.display(),
        outcome.report.overview.files,
        stats.analyzed,
        stats.reused,
        stats.excluded,
        stats.errors
    );
}

pub fn output_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing JSON output")?;
    println!("{}", json);
    Ok(())
}

pub fn exit_code(outcome: &ScanOutcome) -> u8 {
    match outcome.status {
        codemap::ScanStatus::Success => 0,
        codemap::ScanStatus::Partial => EXIT_SCAN_ERROR,
    }
}
