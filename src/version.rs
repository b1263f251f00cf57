//! Version and build information.
//!
//! Build metadata is injected by `build.rs`; each piece falls back to
//! `"unknown"` when the build environment could not provide it.

/// Full version string: `codemap {version} ({commit} {date}) rustc {rustc_version}`
pub fn version() -> String {
    format!(
        "codemap {} ({} {}) rustc {}",
        package_version(),
        build_commit(),
        build_date(),
        rustc_version()
    )
}

pub fn package_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn build_commit() -> &'static str {
    option_env!("CODEMAP_COMMIT_SHA").unwrap_or("unknown")
}

pub fn build_date() -> &'static str {
    option_env!("CODEMAP_BUILD_DATE").unwrap_or("unknown")
}

pub fn rustc_version() -> &'static str {
    option_env!("CODEMAP_RUSTC_VERSION").unwrap_or("unknown")
}
