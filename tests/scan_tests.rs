//! End-to-end tests for full scans and single-file updates.

use std::fs;
use std::path::Path;

use codemap::cache::IncrementalCache;
use codemap::error_codes::CM_C_001_CACHE_CORRUPT;
use codemap::{
    full_scan, single_file_update, GroupKind, ScanConfig, ScanContext, ScanDiagnostic, ScanError,
    ScanStatus, SchemaKind,
};
use sha2::{Digest, Sha256};
use tempfile::TempDir;

/// Git lookups are off so results do not depend on the environment.
fn config() -> ScanConfig {
    ScanConfig {
        enable_git: false,
        ..ScanConfig::default()
    }
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn report_text(root: &Path) -> String {
    fs::read_to_string(root.join("CODEMAP.md")).unwrap()
}

fn small_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(
        root,
        "src/routes/users.js",
        "const express = require('express');\n\
         const router = express.Router();\n\
         router.get('/users', getUsers);\n\
         module.exports = router;\n",
    );
    write(
        root,
        "src/types.ts",
        "export interface User { id: string; name?: string }\n",
    );
    write(root, "src/util.py", "def add(a, b):\n    return a + b\n");
    write(root, "README.md", "# Shop\n\nA small shop backend.\n");
    temp
}

#[test]
fn test_two_scans_render_identical_reports() {
    let temp = small_project();
    let root = temp.path();

    let first = full_scan(root, &config(), &ScanContext::new()).unwrap();
    let text1 = report_text(root);
    let second = full_scan(root, &config(), &ScanContext::new()).unwrap();
    let text2 = report_text(root);

    assert_eq!(text1, text2);
    assert_eq!(first.stats.analyzed, 4);
    assert_eq!(second.stats.analyzed, 0);
    assert_eq!(second.stats.reused, 4);
    assert_eq!(second.status, ScanStatus::Success);
}

#[test]
fn test_cache_hash_is_sha256_of_content() {
    let temp = small_project();
    let root = temp.path();
    full_scan(root, &config(), &ScanContext::new()).unwrap();

    let content = fs::read(root.join("src/util.py")).unwrap();
    let expected = hex::encode(Sha256::digest(&content));

    let (cache, err) = IncrementalCache::load(root);
    assert!(err.is_none());
    let entry = cache.entry("src/util.py").unwrap();
    assert_eq!(entry.hash, expected);
    assert_eq!(entry.lang, "py");
}

#[test]
fn test_single_file_update_only_touches_target() {
    let temp = small_project();
    let root = temp.path();
    full_scan(root, &config(), &ScanContext::new()).unwrap();
    let (before, _) = IncrementalCache::load(root);

    // Both change on disk; only one is announced.
    write(root, "src/util.py", "def add(a, b, c):\n    return a + b + c\n");
    write(root, "src/types.ts", "export interface Order { id: string }\n");

    let outcome = single_file_update(
        root,
        Path::new("src/util.py"),
        &config(),
        &ScanContext::new(),
    )
    .unwrap();
    assert_eq!(outcome.stats.analyzed, 1);
    assert_eq!(outcome.stats.reused, 3);

    let (after, _) = IncrementalCache::load(root);
    assert_ne!(
        after.entry("src/util.py").unwrap().hash,
        before.entry("src/util.py").unwrap().hash
    );
    assert_eq!(
        after.entry("src/types.ts").unwrap(),
        before.entry("src/types.ts").unwrap()
    );

    let text = report_text(root);
    assert!(text.contains("- function add(a, b, c)"));
    assert!(text.contains("interface User"));
    assert!(!text.contains("interface Order"));
}

#[test]
fn test_full_rescan_changes_only_the_edited_file() {
    let temp = small_project();
    let root = temp.path();
    let first = full_scan(root, &config(), &ScanContext::new()).unwrap();
    let (before, _) = IncrementalCache::load(root);

    write(root, "src/util.py", "def add(a, b, c):\n    return a + b + c\n");
    let second = full_scan(root, &config(), &ScanContext::new()).unwrap();
    let (after, _) = IncrementalCache::load(root);

    assert_eq!(second.stats.analyzed, 1);
    assert_eq!(second.stats.reused, 3);
    assert_eq!(
        before.files.keys().collect::<Vec<_>>(),
        after.files.keys().collect::<Vec<_>>()
    );
    for (path, entry) in &after.files {
        if path == "src/util.py" {
            assert_ne!(entry, &before.files[path]);
        } else {
            assert_eq!(entry, &before.files[path], "cache entry for {} changed", path);
        }
    }

    assert_eq!(first.report.files.len(), second.report.files.len());
    for record in &second.report.files {
        let old = first
            .report
            .files
            .iter()
            .find(|r| r.path == record.path)
            .unwrap();
        if record.path == "src/util.py" {
            assert_ne!(record, old);
            assert_ne!(record.hash, old.hash);
        } else {
            assert_eq!(record, old, "record for {} changed", record.path);
        }
    }
}

#[test]
fn test_single_file_update_of_deleted_file_prunes_it() {
    let temp = small_project();
    let root = temp.path();
    full_scan(root, &config(), &ScanContext::new()).unwrap();

    fs::remove_file(root.join("src/util.py")).unwrap();
    let outcome = single_file_update(
        root,
        Path::new("src/util.py"),
        &config(),
        &ScanContext::new(),
    )
    .unwrap();

    assert_eq!(outcome.report.overview.files, 3);
    let (cache, _) = IncrementalCache::load(root);
    assert!(cache.entry("src/util.py").is_none());
    assert!(!report_text(root).contains("### /src/util.py"));
}

#[test]
fn test_symbols_truncated_at_limit() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source: String = (0..200)
        .map(|i| format!("def handler_{}(request):\n    return {}\n\n", i, i))
        .collect();
    write(root, "src/handlers.py", &source);

    let outcome = full_scan(root, &config(), &ScanContext::new()).unwrap();
    let record = &outcome.report.files[0];
    assert_eq!(record.symbols.len(), 150);
    assert!(record.truncated);
    assert!(report_text(root).contains("truncated: true\n"));
}

#[test]
fn test_extension_group_of_nine_not_seven() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    for i in 0..9 {
        write(root, &format!("widgets/w{:02}.ts", i), "export const x = 1;\n");
    }
    for i in 0..7 {
        write(root, &format!("widgets/w{:02}.js", i), "module.exports = 1;\n");
    }

    let outcome = full_scan(root, &config(), &ScanContext::new()).unwrap();
    let report = &outcome.report;
    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].kind, GroupKind::Extension);
    assert_eq!(report.groups[0].pattern, "*.ts");
    assert_eq!(report.groups[0].file_count, 9);

    assert_eq!(report.overview.files, 16);
    assert_eq!(report.overview.grouped, 9);
    assert_eq!(report.files.len(), 7);
    assert!(report.files.iter().all(|f| f.path.ends_with(".js")));

    let text = report_text(root);
    assert!(text.contains("- /widgets/*.ts — 9 TS files; 9 files"));
}

#[test]
fn test_route_and_interface_schema_reported() {
    let temp = small_project();
    let root = temp.path();
    let outcome = full_scan(root, &config(), &ScanContext::new()).unwrap();

    let routes = outcome
        .report
        .files
        .iter()
        .find(|f| f.path == "src/routes/users.js")
        .unwrap();
    assert_eq!(routes.routes.len(), 1);
    assert_eq!(routes.routes[0].method, "GET");
    assert_eq!(routes.routes[0].path, "/users");
    assert_eq!(routes.routes[0].handler, "getUsers");

    let types = outcome
        .report
        .files
        .iter()
        .find(|f| f.path == "src/types.ts")
        .unwrap();
    assert_eq!(types.schemas.len(), 1);
    assert_eq!(types.schemas[0].name, "User");
    assert_eq!(types.schemas[0].kind, SchemaKind::Interface);

    let text = report_text(root);
    assert!(text.contains("- GET /users -> getUsers\n"));
    assert!(text.contains("- interface User {id: string, name?: string}"));
    assert!(outcome.report.overview.frameworks.contains(&"express".to_string()));
}

#[test]
fn test_small_root_level_route_file_is_analyzed() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "users.js", "router.get('/users', getUsers);\n");

    let outcome = full_scan(root, &config(), &ScanContext::new()).unwrap();
    let record = &outcome.report.files[0];
    assert_eq!(record.path, "users.js");
    assert!(!record.deep);
    assert_eq!(record.routes.len(), 1);
    assert_eq!(record.routes[0].method, "GET");
    assert_eq!(record.routes[0].path, "/users");
    assert_eq!(record.routes[0].handler, "getUsers");
    assert!(report_text(root).contains("- GET /users -> getUsers\n"));
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_does_not_abort() {
    use std::os::unix::fs::PermissionsExt;

    let temp = small_project();
    let root = temp.path();
    write(root, "locked/secret.py", "x = 1\n");
    let locked = root.join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can still list it; nothing to check then.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let outcome = full_scan(root, &config(), &ScanContext::new());
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    let outcome = outcome.unwrap();

    assert_eq!(outcome.status, ScanStatus::Partial);
    assert_eq!(outcome.report.overview.files, 4);
    assert!(outcome
        .diagnostics
        .iter()
        .any(|d| d.is_error() && d.path() == "locked"));
    assert!(root.join("CODEMAP.md").exists());
}

#[test]
fn test_binary_and_oversized_files_excluded_but_counted() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "src/app.py", "print('hi')\n");
    write(root, "big.txt", &"x".repeat(3 * 1024));
    fs::write(root.join("logo.png"), [0x89u8, b'P', b'N', b'G', 0, 0, 0, 0]).unwrap();
    fs::write(root.join("blob.txt"), [b'a', 0, b'b']).unwrap();

    let config = ScanConfig {
        max_file_kb: 2,
        count_excluded_bytes: true,
        ..config()
    };
    let outcome = full_scan(root, &config, &ScanContext::new()).unwrap();
    let report = &outcome.report;

    assert_eq!(report.overview.files, 2);
    assert_eq!(report.overview.excluded_files, Some(2));
    assert_eq!(report.overview.excluded_bytes, Some(3 * 1024 + 8));
    assert_eq!(outcome.stats.excluded, 2);

    let paths: Vec<&str> = report.files.iter().map(|f| f.path.as_str()).collect();
    assert!(!paths.contains(&"big.txt"));
    assert!(!paths.contains(&"logo.png"));

    let blob = report.files.iter().find(|f| f.path == "blob.txt").unwrap();
    assert_eq!(blob.summary, "binary data");
    assert!(blob.symbols.is_empty());

    assert!(report_text(root).contains("excluded: 2 files (3.0KB)\n"));
}

#[test]
fn test_corrupt_cache_is_rebuilt() {
    let temp = small_project();
    let root = temp.path();
    let cache_path = IncrementalCache::path_for(root);
    fs::create_dir_all(cache_path.parent().unwrap()).unwrap();
    fs::write(&cache_path, "{\"version\": 1, \"files\": [").unwrap();

    let outcome = full_scan(root, &config(), &ScanContext::new()).unwrap();
    assert_eq!(outcome.stats.analyzed, 4);
    assert!(outcome.diagnostics.iter().any(|d| matches!(
        d,
        ScanDiagnostic::Error { code, .. } if *code == CM_C_001_CACHE_CORRUPT
    )));

    let (cache, err) = IncrementalCache::load(root);
    assert!(err.is_none());
    assert_eq!(cache.files.len(), 4);
}

#[test]
fn test_missing_root_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("nope");

    let err = full_scan(&root, &config(), &ScanContext::new()).unwrap_err();
    assert!(matches!(err, ScanError::WorkspaceNotFound(_)));
    assert!(err.is_fatal());
    assert!(!root.exists());
}

#[test]
fn test_changed_settings_reanalyze_everything() {
    let temp = small_project();
    let root = temp.path();
    full_scan(root, &config(), &ScanContext::new()).unwrap();

    let narrower = ScanConfig {
        max_symbols: 10,
        ..config()
    };
    let outcome = full_scan(root, &narrower, &ScanContext::new()).unwrap();
    assert_eq!(outcome.stats.analyzed, 4);
    assert_eq!(outcome.stats.reused, 0);
}

#[test]
fn test_report_sections_toggle_from_config_file() {
    let temp = small_project();
    let root = temp.path();
    write(root, "codemap.toml", "emit-routes = false\nenable-git = false\n");

    let config = ScanConfig::load(root).unwrap();
    assert!(!config.emit_routes);
    full_scan(root, &config, &ScanContext::new()).unwrap();

    let text = report_text(root);
    assert!(!text.contains("routes:\n"));
    assert!(text.contains("schemas:\n"));
}
