//! Which files get the full analyzer, and how report entries are ranked.

use crate::model::FileRecord;

/// File name fragments that mark entry points, configuration and schemas.
pub const KEY_FILE_PATTERNS: &[&str] = &[
    "package.json",
    "tsconfig",
    "config",
    "env",
    "index",
    "main",
    "app",
    "server",
    "api",
    "readme",
    "changelog",
    "schema",
    "model",
    "prisma",
];

/// Directory names that carry architectural meaning.
pub const ARCHITECTURAL_DIRS: &[&str] = &[
    "routes",
    "api",
    "controllers",
    "services",
    "models",
    "components",
    "pages",
    "hooks",
    "utils",
    "lib",
    "middleware",
    "auth",
    "database",
    "migrations",
    "src",
    "server",
    "client",
];

/// Extensions analyzed in full once they have real content.
const CODE_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "py", "java", "cs"];

/// Words that make a large file worth a full pass.
const CONTENT_MARKERS: &[&str] = &[
    "export",
    "function",
    "class",
    "route",
    "model",
    "component",
    "import",
];

const CODE_MIN_BYTES: usize = 200;
const LARGE_FILE_BYTES: usize = 1000;

/// Whether the lowercase file name contains a key-file fragment.
pub fn is_key_file(rel_path: &str) -> bool {
    let name = rel_path.rsplit('/').next().unwrap_or(rel_path).to_ascii_lowercase();
    KEY_FILE_PATTERNS.iter().any(|p| name.contains(p))
}

/// Deep-analysis predicate.
///
/// True when any of these holds:
/// - the file name contains a key-file fragment
/// - a directory component is architectural
/// - a code extension with more than 200 bytes
/// - more than 1000 bytes mentioning a content marker
pub fn is_important(rel_path: &str, content: &str) -> bool {
    if is_key_file(rel_path) {
        return true;
    }

    if let Some((dir, _)) = rel_path.rsplit_once('/') {
        if dir
            .split('/')
            .any(|c| ARCHITECTURAL_DIRS.contains(&c.to_ascii_lowercase().as_str()))
        {
            return true;
        }
    }

    let ext = crate::discovery::extension_of(rel_path).unwrap_or_default();
    if CODE_EXTENSIONS.contains(&ext.as_str()) && content.len() > CODE_MIN_BYTES {
        return true;
    }

    content.len() > LARGE_FILE_BYTES && CONTENT_MARKERS.iter().any(|m| content.contains(m))
}

/// Ranking score for the FILES section; higher comes first.
pub fn score(record: &FileRecord) -> u64 {
    let key = if is_key_file(&record.path) { 10 } else { 0 };
    key + 2 * record.symbols.len() as u64
        + 3 * record.detectors.len() as u64
        + record.references.len() as u64
        + (record.bytes / 1024).min(10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Limits, PartialFileRecord, SymbolKind, SymbolRecord};

    #[test]
    fn test_key_files_are_important() {
        assert!(is_important("package.json", "{}"));
        assert!(is_important("deploy/App.vue", ""));
        assert!(is_important("docs/README.md", ""));
        assert!(!is_important("notes/todo.txt", "short"));
    }

    #[test]
    fn test_architectural_directory_component() {
        assert!(is_important("src/x.txt", ""));
        assert!(is_important("web/Components/x.txt", ""));
        // substring of a component does not count
        assert!(!is_important("resources/x.txt", ""));
    }

    #[test]
    fn test_code_extension_threshold() {
        let small = "x".repeat(200);
        let big = "x".repeat(201);
        assert!(!is_important("scripts/run.py", &small));
        assert!(is_important("scripts/run.py", &big));
        assert!(!is_important("scripts/run.rb", &big));
    }

    #[test]
    fn test_large_file_with_markers() {
        let mut content = "a".repeat(1001);
        assert!(!is_important("scripts/run.rb", &content));
        content.push_str(" class ");
        assert!(is_important("scripts/run.rb", &content));
    }

    #[test]
    fn test_score() {
        let mut partial = PartialFileRecord::default();
        partial.symbols.push(SymbolRecord::new(SymbolKind::Function, "a"));
        partial.symbols.push(SymbolRecord::new(SymbolKind::Function, "b"));
        partial.add_detector("express");
        partial.add_reference("express");
        let record = FileRecord::from_partial(
            "src/server.ts".into(),
            "ts".into(),
            "h".into(),
            50 * 1024,
            String::new(),
            partial,
            true,
            Limits {
                max_symbols: 150,
                max_refs: 50,
            },
        );
        // 10 + 2*2 + 3*1 + 1 + min(50, 10)
        assert_eq!(score(&record), 28);
    }
}
