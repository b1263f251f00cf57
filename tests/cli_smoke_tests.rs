//! CLI smoke tests for the codemap binary
//!
//! Spawns the binary against temp workspaces and checks exit codes and the
//! files it leaves behind.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn codemap(args: &[&str], root: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_codemap"))
        .args(args)
        .arg(root)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to start codemap binary")
}

fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("src")).unwrap();
    fs::write(
        temp.path().join("src/app.py"),
        "from flask import Flask\napp = Flask(__name__)\n\n@app.route('/health')\ndef health():\n    return 'ok'\n",
    )
    .unwrap();
    fs::write(temp.path().join("codemap.toml"), "enable-git = false\n").unwrap();
    temp
}

#[test]
fn test_scan_writes_report_and_cache() {
    let temp = project();
    let output = codemap(&["scan"], temp.path());

    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report = fs::read_to_string(temp.path().join("CODEMAP.md")).unwrap();
    assert!(report.starts_with("# CODEMAP v1\n"));
    assert!(report.contains("### /src/app.py"));
    assert!(temp.path().join(".codemap/index.json").exists());
}

#[test]
fn test_scan_json_outcome() {
    let temp = project();
    let output = codemap(&["scan", "--json"], temp.path());
    assert_eq!(output.status.code(), Some(0));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["status"], "success");
    assert_eq!(value["stats"]["analyzed"], 2);
}

#[test]
fn test_missing_root_exits_with_two() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("absent");
    let output = codemap(&["scan"], &missing);

    assert_eq!(output.status.code(), Some(2));
    assert!(!missing.exists());
}

#[test]
fn test_verify_fail_if_stale() {
    let temp = project();
    assert_eq!(codemap(&["scan"], temp.path()).status.code(), Some(0));
    assert_eq!(
        codemap(&["verify", "--fail-if-stale"], temp.path()).status.code(),
        Some(0)
    );

    fs::write(temp.path().join("src/app.py"), "print('changed')\n").unwrap();
    let output = codemap(&["verify", "--fail-if-stale"], temp.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("~ src/app.py"));
}
