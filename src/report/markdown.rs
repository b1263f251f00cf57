//! Markdown rendering of a [`Report`].
//!
//! Section order is fixed: header, OVERVIEW, DIRECTORIES, FILE GROUPS, FILES,
//! CROSS REFERENCES, TECH STACK. Every section header is always emitted so
//! consumers can split the document on `## ` lines.

use super::{Report, REPORT_VERSION};
use crate::model::{FileGroup, FileRecord, RouteRecord, SchemaRecord, SymbolRecord};

/// Human-readable size: `512B`, `1.2KB`, `3.4MB`.
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    if bytes < 1024 {
        return format!("{}B", bytes);
    }
    // Pick the unit from the rounded value so 1048575 is 1.0MB, not 1024.0KB.
    let kb = bytes as f64 / KB;
    if (kb * 10.0).round() < KB * 10.0 {
        format!("{:.1}KB", kb)
    } else {
        format!("{:.1}MB", kb / KB)
    }
}

/// First six and last two characters: `abcdef..12`.
pub fn short_hash(hash: &str) -> String {
    if hash.len() <= 8 {
        return hash.to_string();
    }
    format!("{}..{}", &hash[..6], &hash[hash.len() - 2..])
}

/// Render the full document.
pub fn render(report: &Report) -> String {
    let mut out = String::new();
    header(&mut out, report);
    overview(&mut out, report);
    directories(&mut out, report);
    groups(&mut out, &report.groups);
    files(&mut out, report);
    cross_references(&mut out, report);
    tech_stack(&mut out, report);
    out
}

fn header(out: &mut String, report: &Report) {
    out.push_str(&format!("# CODEMAP v{}\n", REPORT_VERSION));
    out.push_str(&format!(
        "project: {}   root: /   last_scan: {}",
        report.project,
        report.last_scan.as_deref().unwrap_or("never")
    ));
    if let Some(head) = &report.head {
        out.push_str(&format!("   head: {}", head));
    }
    out.push_str("\n\n");
}

fn overview(out: &mut String, report: &Report) {
    let o = &report.overview;
    out.push_str("## OVERVIEW\n");
    out.push_str(&format!(
        "files: {}  bytes: {}  deep: {}  grouped: {}\n",
        o.files,
        format_bytes(o.bytes),
        o.deep,
        o.grouped
    ));
    let languages: Vec<String> = o
        .languages
        .iter()
        .map(|t| format!("{} {}", display_tag(&t.tag), t.count))
        .collect();
    out.push_str(&format!("languages: {}\n", join_or_none(&languages)));
    out.push_str(&format!("frameworks: {}\n", join_or_none(&o.frameworks)));
    if let (Some(files), Some(bytes)) = (o.excluded_files, o.excluded_bytes) {
        out.push_str(&format!("excluded: {} files ({})\n", files, format_bytes(bytes)));
    }
    out.push('\n');
}

fn directories(out: &mut String, report: &Report) {
    out.push_str("## DIRECTORIES\n");
    for dir in &report.directories {
        out.push_str(&format!("- /{} — {}\n", dir.path, dir.description));
    }
    out.push('\n');
}

fn groups(out: &mut String, groups: &[FileGroup]) {
    out.push_str("## FILE GROUPS\n");
    for group in groups {
        let location = if group.directory.is_empty() {
            format!("/{}", group.pattern)
        } else {
            format!("/{}/{}", group.directory, group.pattern)
        };
        out.push_str(&format!(
            "- {} — {}; {} files, {}; e.g. {}\n",
            location,
            group.description,
            group.file_count,
            format_bytes(group.total_bytes),
            group.samples.join(", ")
        ));
    }
    out.push('\n');
}

fn files(out: &mut String, report: &Report) {
    out.push_str("## FILES\n");
    for record in &report.files {
        file_entry(out, record, report);
    }
    if report.files.is_empty() {
        out.push('\n');
    }
}

fn file_entry(out: &mut String, record: &FileRecord, report: &Report) {
    out.push_str(&format!("### /{}\n", record.path));
    out.push_str(&format!(
        "hash: {}  lang: {}  size: {}\n",
        short_hash(&record.hash),
        display_tag(&record.language),
        format_bytes(record.bytes)
    ));
    if !record.summary.is_empty() {
        out.push_str(&format!("summary: {}\n", record.summary));
    }
    if !record.detectors.is_empty() {
        out.push_str(&format!("detectors: {}\n", record.detectors.join(", ")));
    }
    if report.sections.symbols && !record.symbols.is_empty() {
        out.push_str("symbols:\n");
        for symbol in &record.symbols {
            out.push_str(&format!("- {}\n", symbol_line(symbol)));
        }
    }
    if report.sections.routes && !record.routes.is_empty() {
        out.push_str("routes:\n");
        for route in &record.routes {
            out.push_str(&format!("- {}\n", route_line(route)));
        }
    }
    if report.sections.schemas && !record.schemas.is_empty() {
        out.push_str("schemas:\n");
        for schema in &record.schemas {
            out.push_str(&format!("- {}\n", schema_line(schema)));
        }
    }
    if !record.references.is_empty() {
        out.push_str(&format!("refs: {}\n", record.references.join(", ")));
    }
    if record.truncated {
        out.push_str("truncated: true\n");
    }
    out.push('\n');
}

fn symbol_line(symbol: &SymbolRecord) -> String {
    let mut line = format!("{} {}", symbol.kind, symbol.name);
    if let Some(params) = &symbol.params {
        line.push_str(&format!("({})", params.join(", ")));
    }
    if let Some(detail) = &symbol.detail {
        line.push_str(&format!(" <{}>", detail));
    }
    let mut meta = Vec::new();
    if let Some(n) = symbol.line {
        meta.push(format!("line {}", n));
    }
    if let Some(c) = symbol.complexity {
        meta.push(format!("complexity {}", c));
    }
    if !meta.is_empty() {
        line.push_str(&format!(" [{}]", meta.join(", ")));
    }
    if let Some(description) = &symbol.description {
        line.push_str(&format!(": {}", description));
    }
    line
}

fn route_line(route: &RouteRecord) -> String {
    let mut line = format!("{} {} -> {}", route.method, route.path, route.handler);
    if !route.middleware.is_empty() {
        line.push_str(&format!(" [{}]", route.middleware.join(", ")));
    }
    if let Some(description) = &route.description {
        line.push_str(&format!(": {}", description));
    }
    line
}

fn schema_line(schema: &SchemaRecord) -> String {
    let fields: Vec<String> = schema
        .fields
        .iter()
        .map(|f| {
            let marker = if f.nullable { "?" } else { "" };
            format!("{}{}: {}", f.name, marker, f.ty)
        })
        .collect();
    let mut line = format!("{} {} {{{}}}", schema.kind.as_str(), schema.name, fields.join(", "));
    if !schema.relations.is_empty() {
        let relations: Vec<String> = schema
            .relations
            .iter()
            .map(|r| format!("{} -> {}", r.field, r.target))
            .collect();
        line.push_str(&format!(" relations: {}", relations.join(", ")));
    }
    line
}

fn cross_references(out: &mut String, report: &Report) {
    out.push_str("## CROSS REFERENCES\n");
    for xref in &report.cross_references {
        let files: Vec<String> = xref.files.iter().map(|f| format!("/{}", f)).collect();
        out.push_str(&format!(
            "- {} ({} files): {}\n",
            xref.module,
            xref.files.len(),
            files.join(", ")
        ));
    }
    out.push('\n');
}

fn tech_stack(out: &mut String, report: &Report) {
    out.push_str("## TECH STACK\n");
    for tag in &report.tech_stack {
        out.push_str(&format!("- {}: {}\n", tag.tag, tag.count));
    }
}

fn display_tag(tag: &str) -> &str {
    if tag.is_empty() {
        "unknown"
    } else {
        tag
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
