//! Aggregated report.
//!
//! [`Report::build`] turns the scan's file records, groups and exclusions into
//! one serializable value; [`markdown::render`] writes it out. Everything the
//! report contains is derived from its inputs: two builds over the same
//! records produce the same report, byte for byte once rendered.

pub mod markdown;

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::ScanConfig;
use crate::discovery::ExcludedFile;
use crate::importance;
use crate::model::{FileGroup, FileRecord};

pub use markdown::{format_bytes, render, short_hash};

/// Report format version in the header line.
pub const REPORT_VERSION: u32 = 1;

/// Detector tags counted as frameworks in the overview.
pub const FRAMEWORK_DETECTORS: &[&str] = &[
    "react",
    "nextjs",
    "express",
    "nestjs",
    "vue",
    "angular",
    "prisma",
    "mongoose",
    "socket.io",
    "flask",
    "django",
    "fastapi",
    "sqlalchemy",
    "pydantic",
    "spring",
    "aspnet",
    "jpa",
    "entity-framework",
    "graphql",
];

/// Top detectors named in a directory description.
const DIRECTORY_DETECTORS: usize = 2;

/// A tag and how many files carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overview {
    /// Every reported file, grouped or not
    pub files: usize,
    pub bytes: u64,
    /// Files that went through their full analyzer
    pub deep: usize,
    /// Files summarized by a group
    pub grouped: usize,
    pub languages: Vec<TagCount>,
    pub frameworks: Vec<String>,
    /// Present only when excluded bytes are counted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_files: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectorySummary {
    pub path: String,
    pub description: String,
}

/// A module referenced from more than one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossReference {
    pub module: String,
    /// Referencing files, in path order
    pub files: Vec<String>,
}

/// Which optional per-file lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sections {
    pub symbols: bool,
    pub routes: bool,
    pub schemas: bool,
}

impl Sections {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            symbols: config.emit_symbols,
            routes: config.emit_routes,
            schemas: config.emit_schemas,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub version: u32,
    pub project: String,
    /// RFC 3339, from the newest cache timestamp among reported files
    pub last_scan: Option<String>,
    pub head: Option<String>,
    pub overview: Overview,
    pub directories: Vec<DirectorySummary>,
    pub groups: Vec<FileGroup>,
    /// Ungrouped files, most important first
    pub files: Vec<FileRecord>,
    pub cross_references: Vec<CrossReference>,
    pub tech_stack: Vec<TagCount>,
    pub sections: Sections,
}

/// Everything a report is built from.
pub struct ReportInput<'a> {
    pub project: String,
    pub head: Option<String>,
    /// Epoch milliseconds
    pub last_scan: Option<i64>,
    pub records: Vec<FileRecord>,
    pub groups: Vec<FileGroup>,
    pub excluded: &'a [ExcludedFile],
    pub config: &'a ScanConfig,
}

impl Report {
    pub fn build(input: ReportInput<'_>) -> Self {
        let grouped_paths: BTreeSet<&str> = input
            .groups
            .iter()
            .flat_map(|g| g.paths.iter().map(String::as_str))
            .collect();
        let (grouped, ungrouped): (Vec<&FileRecord>, Vec<&FileRecord>) = input
            .records
            .iter()
            .partition(|r| grouped_paths.contains(r.path.as_str()));

        let overview = overview(&input.records, &ungrouped, grouped.len(), &input);
        let directories = directories(&input.records, &ungrouped);
        let cross_references = cross_references(&ungrouped);
        let tech_stack = detector_histogram(&ungrouped);

        let mut files: Vec<FileRecord> = ungrouped.into_iter().cloned().collect();
        files.sort_by(|a, b| {
            importance::score(b)
                .cmp(&importance::score(a))
                .then_with(|| a.path.cmp(&b.path))
        });

        Self {
            version: REPORT_VERSION,
            project: input.project,
            last_scan: input.last_scan.and_then(format_timestamp),
            head: input.head,
            overview,
            directories,
            groups: input.groups,
            files,
            cross_references,
            tech_stack,
            sections: Sections::from_config(input.config),
        }
    }
}

/// Epoch milliseconds as RFC 3339 UTC with millisecond precision.
pub fn format_timestamp(millis: i64) -> Option<String> {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
}

fn overview(
    all: &[FileRecord],
    ungrouped: &[&FileRecord],
    grouped: usize,
    input: &ReportInput<'_>,
) -> Overview {
    let mut languages: BTreeMap<&str, usize> = BTreeMap::new();
    for record in all {
        *languages.entry(record.language.as_str()).or_default() += 1;
    }

    let frameworks = detector_histogram(ungrouped)
        .into_iter()
        .filter(|t| FRAMEWORK_DETECTORS.contains(&t.tag.as_str()))
        .map(|t| t.tag)
        .collect();

    let (excluded_files, excluded_bytes) = if input.config.count_excluded_bytes {
        (
            Some(input.excluded.len()),
            Some(input.excluded.iter().map(|e| e.size).sum()),
        )
    } else {
        (None, None)
    };

    Overview {
        files: all.len(),
        bytes: all.iter().map(|r| r.bytes).sum(),
        deep: all.iter().filter(|r| r.deep).count(),
        grouped,
        languages: sorted_counts(languages),
        frameworks,
        excluded_files,
        excluded_bytes,
    }
}

/// One line per directory holding at least one file; the root is omitted.
fn directories(all: &[FileRecord], ungrouped: &[&FileRecord]) -> Vec<DirectorySummary> {
    let mut languages: BTreeMap<&str, BTreeMap<&str, usize>> = BTreeMap::new();
    for record in all {
        let dir = record.directory();
        if dir.is_empty() {
            continue;
        }
        *languages
            .entry(dir)
            .or_default()
            .entry(record.language.as_str())
            .or_default() += 1;
    }

    let mut detectors: BTreeMap<&str, Vec<&FileRecord>> = BTreeMap::new();
    for record in ungrouped.iter().copied() {
        detectors.entry(record.directory()).or_default().push(record);
    }

    languages
        .into_iter()
        .map(|(dir, langs)| {
            let primary = sorted_counts(langs)
                .into_iter()
                .next()
                .map(|t| t.tag)
                .unwrap_or_default();
            let mut description = format!("{} {}", primary, directory_role(dir));
            let top: Vec<String> = detectors
                .get(dir)
                .map(|files| detector_histogram(files))
                .unwrap_or_default()
                .into_iter()
                .filter(|t| t.tag != primary)
                .take(DIRECTORY_DETECTORS)
                .map(|t| t.tag)
                .collect();
            if !top.is_empty() {
                description.push_str(&format!(" ({})", top.join(", ")));
            }
            DirectorySummary {
                path: dir.to_string(),
                description,
            }
        })
        .collect()
}

/// Role noun from the directory's own name.
fn directory_role(dir: &str) -> &'static str {
    let name = dir.rsplit('/').next().unwrap_or(dir).to_ascii_lowercase();
    if name.contains("route") || name.contains("api") {
        "API routes"
    } else if name.contains("component") {
        "components"
    } else if name.contains("model") || name.contains("entit") {
        "data models"
    } else if name.contains("util") || name.contains("helper") {
        "utilities"
    } else if name.contains("test") || name.contains("spec") {
        "tests"
    } else if name.contains("config") {
        "configuration"
    } else {
        "files"
    }
}

fn cross_references(files: &[&FileRecord]) -> Vec<CrossReference> {
    let mut by_module: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for record in files {
        for module in &record.references {
            by_module
                .entry(module.as_str())
                .or_default()
                .push(record.path.clone());
        }
    }

    let mut refs: Vec<CrossReference> = by_module
        .into_iter()
        .filter(|(_, files)| files.len() > 1)
        .map(|(module, mut files)| {
            files.sort();
            CrossReference {
                module: module.to_string(),
                files,
            }
        })
        .collect();
    refs.sort_by(|a, b| {
        b.files
            .len()
            .cmp(&a.files.len())
            .then_with(|| a.module.cmp(&b.module))
    });
    refs
}

fn detector_histogram(files: &[&FileRecord]) -> Vec<TagCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in files {
        for tag in &record.detectors {
            *counts.entry(tag.as_str()).or_default() += 1;
        }
    }
    sorted_counts(counts)
}

/// Count descending, then tag ascending.
fn sorted_counts(counts: BTreeMap<&str, usize>) -> Vec<TagCount> {
    let mut out: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount {
            tag: tag.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{GroupKind, Limits, PartialFileRecord, SymbolKind, SymbolRecord};

    pub(crate) fn record(path: &str, detectors: &[&str], refs: &[&str], bytes: u64) -> FileRecord {
        let mut partial = PartialFileRecord::default();
        for d in detectors {
            partial.add_detector(*d);
        }
        for r in refs {
            partial.add_reference(*r);
        }
        FileRecord::from_partial(
            path.to_string(),
            crate::analyze::language_tag(path),
            "abcdef0123456789".to_string(),
            bytes,
            format!("summary of {}", path),
            partial,
            true,
            Limits {
                max_symbols: 150,
                max_refs: 50,
            },
        )
    }

    fn build(records: Vec<FileRecord>, groups: Vec<FileGroup>, config: &ScanConfig) -> Report {
        Report::build(ReportInput {
            project: "shop".to_string(),
            head: None,
            last_scan: Some(0),
            records,
            groups,
            excluded: &[],
            config,
        })
    }

    #[test]
    fn test_cross_references_need_two_files() {
        let config = ScanConfig::default();
        let report = build(
            vec![
                record("src/a.ts", &["express"], &["express", "zod"], 10),
                record("src/b.ts", &["express"], &["express"], 10),
                record("src/c.ts", &[], &["lodash", "zod"], 10),
                record("src/d.ts", &[], &["lodash"], 10),
            ],
            Vec::new(),
            &config,
        );
        let modules: Vec<(&str, usize)> = report
            .cross_references
            .iter()
            .map(|c| (c.module.as_str(), c.files.len()))
            .collect();
        assert_eq!(modules, vec![("express", 2), ("lodash", 2), ("zod", 2)]);
        assert_eq!(report.overview.frameworks, vec!["express"]);
    }

    #[test]
    fn test_grouped_files_count_in_totals_only() {
        let config = ScanConfig::default();
        let records = vec![
            record("src/app.ts", &["react"], &["react"], 100),
            record("public/img/a.png", &["png"], &["react"], 200),
        ];
        let group = FileGroup {
            directory: "public/img".into(),
            kind: GroupKind::Image,
            pattern: "*.{png}".into(),
            file_count: 1,
            total_bytes: 200,
            description: "1 images (png)".into(),
            samples: vec!["a.png".into()],
            paths: vec!["public/img/a.png".into()],
        };
        let report = build(records, vec![group], &config);

        assert_eq!(report.overview.files, 2);
        assert_eq!(report.overview.bytes, 300);
        assert_eq!(report.overview.grouped, 1);
        assert_eq!(report.files.len(), 1);
        assert!(report.cross_references.is_empty());
        assert_eq!(
            report.tech_stack,
            vec![TagCount {
                tag: "react".into(),
                count: 1
            }]
        );
        assert!(report
            .overview
            .languages
            .contains(&TagCount { tag: "png".into(), count: 1 }));
    }

    #[test]
    fn test_files_sorted_by_importance_then_path() {
        let config = ScanConfig::default();
        let mut busy = record("lib/z.ts", &["express"], &[], 10);
        busy.symbols
            .push(SymbolRecord::new(SymbolKind::Function, "handler"));
        let report = build(
            vec![
                record("lib/b.ts", &[], &[], 10),
                record("lib/a.ts", &[], &[], 10),
                busy,
            ],
            Vec::new(),
            &config,
        );
        let order: Vec<&str> = report.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(order, vec!["lib/z.ts", "lib/a.ts", "lib/b.ts"]);
    }

    #[test]
    fn test_directory_descriptions() {
        let config = ScanConfig::default();
        let report = build(
            vec![
                record("README.md", &["readme"], &[], 10),
                record("src/routes/users.ts", &["express", "middleware"], &[], 10),
                record("src/routes/orders.ts", &["express"], &[], 10),
                record("src/routes/schema.json", &[], &[], 10),
            ],
            Vec::new(),
            &config,
        );
        assert_eq!(
            report.directories,
            vec![DirectorySummary {
                path: "src/routes".into(),
                description: "ts API routes (express, middleware)".into(),
            }]
        );
    }

    #[test]
    fn test_excluded_bytes_only_when_enabled() {
        let excluded = vec![ExcludedFile {
            rel_path: "logo.png".into(),
            size: 4096,
            reason: crate::diagnostics::SkipReason::BinaryExtension,
        }];
        fn input<'a>(excluded: &'a [ExcludedFile], config: &'a ScanConfig) -> ReportInput<'a> {
            ReportInput {
                project: "p".into(),
                head: None,
                last_scan: None,
                records: Vec::new(),
                groups: Vec::new(),
                excluded,
                config,
            }
        }

        let mut config = ScanConfig::default();
        assert_eq!(
            Report::build(input(&excluded, &config)).overview.excluded_bytes,
            None
        );

        config.count_excluded_bytes = true;
        let report = Report::build(input(&excluded, &config));
        assert_eq!(report.overview.excluded_files, Some(1));
        assert_eq!(report.overview.excluded_bytes, Some(4096));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp(1_700_000_000_123).as_deref(),
            Some("2023-11-14T22:13:20.123Z")
        );
    }
}
