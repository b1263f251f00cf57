//! Bulk-directory grouping.
//!
//! Directories full of assets, migrations, tests or same-typed files are
//! summarized as [`FileGroup`]s instead of one report entry per file. Rules
//! are evaluated per directory, first match wins:
//!
//! | Rule | Condition | Pattern |
//! |------|-----------|---------|
//! | binary | ≥80% binary extensions | `*.{exe,dll,bin,so}` |
//! | image | ≥80% images, or >5 images under an image/upload/asset path | `*.{png,svg,…}` |
//! | migration | path mentions migration/version, or all names start with 8+ digits | `migration_*` |
//! | test | (path mentions test/spec, or >70% test/spec paths) and >10 files | `*test*` |
//! | extension | >15 files; each extension with ≥8 files | `*.{ext}` |

use std::collections::BTreeMap;

use crate::discovery::extension_of;
use crate::model::{FileGroup, FileRecord, GroupKind};

const BINARY_EXTENSIONS: &[&str] = &["exe", "dll", "so", "dylib", "bin", "dat"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg", "ico", "bmp"];
const IMAGE_DIR_HINTS: &[&str] = &["image", "upload", "asset"];

const SAMPLE_COUNT: usize = 3;
const TEST_MIN_FILES: usize = 10;
const EXTENSION_MIN_FILES: usize = 15;
const EXTENSION_GROUP_SIZE: usize = 8;

/// Group every directory of `records` that matches a rule.
///
/// Directories are visited in path order and a group's members keep path
/// order, so the output is deterministic for a given record set.
pub fn group_files(records: &[FileRecord]) -> Vec<FileGroup> {
    let mut by_dir: BTreeMap<&str, Vec<&FileRecord>> = BTreeMap::new();
    for record in records {
        by_dir.entry(record.directory()).or_default().push(record);
    }

    let mut groups = Vec::new();
    for (dir, mut files) in by_dir {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        groups.extend(group_directory(dir, &files));
    }
    groups
}

fn group_directory(dir: &str, files: &[&FileRecord]) -> Vec<FileGroup> {
    let dir_lower = dir.to_ascii_lowercase();
    let total = files.len();

    let binaries = count_with_extension(files, BINARY_EXTENSIONS);
    if at_least_80_percent(binaries, total) {
        return vec![make_group(
            dir,
            GroupKind::Binary,
            "*.{exe,dll,bin,so}".to_string(),
            format!("{} binary files", total),
            files,
        )];
    }

    let images = count_with_extension(files, IMAGE_EXTENSIONS);
    if at_least_80_percent(images, total)
        || (images > 5 && IMAGE_DIR_HINTS.iter().any(|h| dir_lower.contains(h)))
    {
        let types = distinct_extensions(files);
        return vec![make_group(
            dir,
            GroupKind::Image,
            format!("*.{{{}}}", types.join(",")),
            format!("{} images ({})", total, types.join(", ")),
            files,
        )];
    }

    if dir_lower.contains("migration")
        || dir_lower.contains("version")
        || files.iter().all(|f| starts_with_timestamp(f.file_name()))
    {
        return vec![make_group(
            dir,
            GroupKind::Migration,
            "migration_*".to_string(),
            format!("{} database migrations", total),
            files,
        )];
    }

    let test_paths = files
        .iter()
        .filter(|f| {
            let lower = f.path.to_ascii_lowercase();
            lower.contains("test") || lower.contains("spec")
        })
        .count();
    let test_dir = dir_lower.contains("test")
        || dir_lower.contains("spec")
        || test_paths * 10 > total * 7;
    if test_dir && total > TEST_MIN_FILES {
        return vec![make_group(
            dir,
            GroupKind::Test,
            "*test*".to_string(),
            format!("{} test files", total),
            files,
        )];
    }

    if total > EXTENSION_MIN_FILES {
        let mut by_ext: BTreeMap<String, Vec<&FileRecord>> = BTreeMap::new();
        for file in files {
            by_ext
                .entry(extension_of(&file.path).unwrap_or_default())
                .or_default()
                .push(file);
        }
        return by_ext
            .into_iter()
            .filter(|(_, members)| members.len() >= EXTENSION_GROUP_SIZE)
            .map(|(ext, members)| {
                make_group(
                    dir,
                    GroupKind::Extension,
                    format!("*.{}", ext),
                    format!("{} {} files", members.len(), ext.to_ascii_uppercase()),
                    &members,
                )
            })
            .collect();
    }

    Vec::new()
}

fn make_group(
    dir: &str,
    kind: GroupKind,
    pattern: String,
    description: String,
    members: &[&FileRecord],
) -> FileGroup {
    FileGroup {
        directory: dir.to_string(),
        kind,
        pattern,
        file_count: members.len(),
        total_bytes: members.iter().map(|f| f.bytes).sum(),
        description,
        samples: members
            .iter()
            .take(SAMPLE_COUNT)
            .map(|f| f.file_name().to_string())
            .collect(),
        paths: members.iter().map(|f| f.path.clone()).collect(),
    }
}

/// `count / total >= 0.8` in integer arithmetic.
fn at_least_80_percent(count: usize, total: usize) -> bool {
    total > 0 && count * 5 >= total * 4
}

fn count_with_extension(files: &[&FileRecord], extensions: &[&str]) -> usize {
    files
        .iter()
        .filter(|f| {
            extension_of(&f.path)
                .map(|ext| extensions.contains(&ext.as_str()))
                .unwrap_or(false)
        })
        .count()
}

/// Extensions in first-seen (path) order.
fn distinct_extensions(files: &[&FileRecord]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for ext in files.iter().filter_map(|f| extension_of(&f.path)) {
        if !seen.contains(&ext) {
            seen.push(ext);
        }
    }
    seen
}

fn starts_with_timestamp(name: &str) -> bool {
    name.chars().take_while(|c| c.is_ascii_digit()).count() >= 8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Limits, PartialFileRecord};

    fn record(path: &str, bytes: u64) -> FileRecord {
        FileRecord::from_partial(
            path.to_string(),
            extension_of(path).unwrap_or_default(),
            "0".repeat(64),
            bytes,
            String::new(),
            PartialFileRecord::default(),
            false,
            Limits {
                max_symbols: 150,
                max_refs: 50,
            },
        )
    }

    fn records(dir: &str, ext: &str, count: usize) -> Vec<FileRecord> {
        (0..count)
            .map(|i| record(&format!("{}/file{:02}.{}", dir, i, ext), 100))
            .collect()
    }

    #[test]
    fn test_extension_rule_groups_nine_not_seven() {
        let mut files = records("src/widgets", "ts", 9);
        files.extend(records("src/widgets", "js", 7));

        let groups = group_files(&files);
        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.kind, GroupKind::Extension);
        assert_eq!(group.pattern, "*.ts");
        assert_eq!(group.file_count, 9);
        assert_eq!(group.total_bytes, 900);
        assert_eq!(group.description, "9 TS files");
        assert_eq!(group.samples, vec!["file00.ts", "file01.ts", "file02.ts"]);
        assert!(group.paths.iter().all(|p| p.ends_with(".ts")));
    }

    #[test]
    fn test_fifteen_files_are_never_extension_grouped() {
        let files = records("src/widgets", "ts", 15);
        assert!(group_files(&files).is_empty());
    }

    #[test]
    fn test_image_directory() {
        let mut files = records("public/img", "png", 4);
        files.extend(records("public/img", "svg", 4));
        files.push(record("public/img/notes.txt", 10));

        let groups = group_files(&files);
        assert_eq!(groups[0].kind, GroupKind::Image);
        assert_eq!(groups[0].pattern, "*.{png,svg,txt}");
        assert_eq!(groups[0].file_count, 9);
    }

    #[test]
    fn test_image_hint_with_few_images() {
        let mut files = records("web/assets", "png", 6);
        files.extend(records("web/assets", "css", 4));
        assert_eq!(group_files(&files)[0].kind, GroupKind::Image);
    }

    #[test]
    fn test_migration_by_name_and_timestamp() {
        let files = records("db/migrations", "sql", 2);
        assert_eq!(group_files(&files)[0].kind, GroupKind::Migration);

        let files = vec![
            record("db/changes/20240101120000_init.sql", 10),
            record("db/changes/20240202120000_users.sql", 10),
        ];
        let groups = group_files(&files);
        assert_eq!(groups[0].kind, GroupKind::Migration);
        assert_eq!(groups[0].pattern, "migration_*");
    }

    #[test]
    fn test_test_directory_needs_more_than_ten_files() {
        let files = records("app/tests", "py", 10);
        assert!(group_files(&files).is_empty());

        let files = records("app/tests", "py", 11);
        let groups = group_files(&files);
        assert_eq!(groups[0].kind, GroupKind::Test);
        assert_eq!(groups[0].description, "11 test files");
    }

    #[test]
    fn test_binary_directory() {
        let mut files = records("vendor/bin", "dll", 4);
        files.push(record("vendor/bin/readme.txt", 5));
        let groups = group_files(&files);
        assert_eq!(groups[0].kind, GroupKind::Binary);
        assert_eq!(groups[0].file_count, 5);
    }

    #[test]
    fn test_small_directories_stay_individual() {
        let files = vec![record("src/a.ts", 1), record("src/b.ts", 1)];
        assert!(group_files(&files).is_empty());
    }
}
