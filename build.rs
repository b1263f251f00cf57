//! Embeds commit, build date and compiler version for `codemap version`.

use std::env;
use std::process::Command;

/// Trimmed stdout of a successful command.
fn stdout_of(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn main() {
    // Packaged builds have no .git; an explicit override wins.
    let commit = env::var("CODEMAP_COMMIT_SHA")
        .ok()
        .or_else(|| stdout_of("git", &["rev-parse", "--short=10", "HEAD"]));

    // Reproducible builds pin the date through SOURCE_DATE_EPOCH.
    let date = match env::var("SOURCE_DATE_EPOCH") {
        Ok(epoch) => stdout_of("date", &["-u", "-d", &format!("@{}", epoch), "+%Y-%m-%d"]),
        Err(_) => stdout_of("date", &["-u", "+%Y-%m-%d"]),
    };

    // Cargo hands build scripts the compiler it will use.
    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let rustc_version = stdout_of(&rustc, &["--version"]).and_then(|v| {
        v.strip_prefix("rustc ")
            .and_then(|rest| rest.split_whitespace().next())
            .map(str::to_string)
    });

    for (key, value) in [
        ("CODEMAP_COMMIT_SHA", commit),
        ("CODEMAP_BUILD_DATE", date),
        ("CODEMAP_RUSTC_VERSION", rustc_version),
    ] {
        if let Some(value) = value {
            println!("cargo:rustc-env={}={}", key, value);
        }
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-env-changed=CODEMAP_COMMIT_SHA");
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
}
