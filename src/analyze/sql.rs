//! SQL DDL analyzer: tables, views and routines.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{default_summary, text, AnalyzeError, Analyzer};
use crate::model::{
    PartialFileRecord, SchemaField, SchemaKind, SchemaRecord, SchemaRelation, SymbolKind,
    SymbolRecord,
};

mod sql_patterns {
    use super::*;

    /// Dialect fingerprints
    pub static DIALECTS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
        [
            (
                "postgres",
                r"(?i)\b(?:BIGSERIAL|SERIAL|JSONB|TIMESTAMPTZ|RETURNING|gen_random_uuid|uuid_generate_v4)\b|::\w+",
            ),
            ("mysql", r"(?i)\bAUTO_INCREMENT\b|\bENGINE\s*=|`\w+`"),
            ("sqlite", r"(?i)\bAUTOINCREMENT\b|\bPRAGMA\b"),
            ("sqlserver", r"(?i)\bIDENTITY\s*\(|\bNVARCHAR\b|(?m)^\s*GO\s*$"),
        ]
        .into_iter()
        .map(|(tag, pattern)| (tag, Regex::new(pattern).expect("Invalid SQL dialect regex")))
        .collect()
    });

    pub static CREATE_TABLE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r#"(?i)\bCREATE\s+(?:OR\s+REPLACE\s+)?(?:(?:TEMP|TEMPORARY|UNLOGGED|VIRTUAL)\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?([\w."`\[\]]+)"#,
        )
        .expect("Invalid CREATE TABLE regex")
    });

    pub static CREATE_VIEW: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r#"(?i)\bCREATE\s+(?:OR\s+REPLACE\s+)?(?:MATERIALIZED\s+)?VIEW\s+(?:IF\s+NOT\s+EXISTS\s+)?([\w."`\[\]]+)"#,
        )
        .expect("Invalid CREATE VIEW regex")
    });

    pub static CREATE_ROUTINE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r#"(?i)\bCREATE\s+(?:OR\s+REPLACE\s+)?(FUNCTION|PROCEDURE|TRIGGER)\s+([\w."`\[\]]+)"#,
        )
        .expect("Invalid CREATE FUNCTION regex")
    });

    pub static ALTER_TABLE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"(?i)\bALTER\s+TABLE\s+(?:ONLY\s+)?(?:IF\s+EXISTS\s+)?([\w."`\[\]]+)"#)
            .expect("Invalid ALTER TABLE regex")
    });

    pub static REFERENCES: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"(?i)\bREFERENCES\s+([\w."`\[\]]+)"#).expect("Invalid REFERENCES regex")
    });

    /// Table-level `FOREIGN KEY (col) REFERENCES target`
    pub static FOREIGN_KEY: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"(?i)FOREIGN\s+KEY\s*\(\s*([\w"`\[\]]+)"#).expect("Invalid FOREIGN KEY regex")
    });
}

use sql_patterns::*;

/// Leading keywords of table-level clauses that are not columns.
const CONSTRAINT_KEYWORDS: &[&str] = &[
    "CONSTRAINT", "PRIMARY", "FOREIGN", "UNIQUE", "CHECK", "INDEX", "KEY", "EXCLUDE", "FULLTEXT",
    "SPATIAL",
];

pub struct SqlAnalyzer;

impl Analyzer for SqlAnalyzer {
    fn name(&self) -> &'static str {
        "sql"
    }

    fn extract(&self, content: &str, _path: &str) -> Result<PartialFileRecord, AnalyzeError> {
        let mut partial = PartialFileRecord::default();
        partial.add_detector("sql");
        for (tag, pattern) in DIALECTS.iter() {
            if pattern.is_match(content) {
                partial.add_detector(*tag);
            }
        }

        let stripped = strip_line_comments(content);
        let lines: Vec<&str> = stripped.lines().collect();

        for caps in CREATE_TABLE.captures_iter(&stripped) {
            let Some(whole) = caps.get(0) else { continue };
            let name = unquote(&caps[1]);
            let idx = line_index(&stripped, whole.start());

            partial.symbols.push(
                SymbolRecord::new(SymbolKind::Entity, &name)
                    .with_detail("table")
                    .at_line(idx + 1),
            );

            let (fields, relations) = match text::find_block(&lines, idx, '(', ')') {
                Some((body, _)) => columns(&body),
                None => (Vec::new(), Vec::new()),
            };
            partial.schemas.push(SchemaRecord {
                name,
                kind: SchemaKind::Table,
                fields,
                relations,
                line: idx + 1,
            });
        }

        for caps in CREATE_VIEW.captures_iter(&stripped) {
            let idx = caps.get(0).map_or(0, |m| line_index(&stripped, m.start()));
            partial.symbols.push(
                SymbolRecord::new(SymbolKind::Entity, unquote(&caps[1]))
                    .with_detail("view")
                    .at_line(idx + 1),
            );
        }

        for caps in CREATE_ROUTINE.captures_iter(&stripped) {
            let idx = caps.get(0).map_or(0, |m| line_index(&stripped, m.start()));
            partial.symbols.push(
                SymbolRecord::new(SymbolKind::Function, unquote(&caps[2]))
                    .with_detail(caps[1].to_ascii_lowercase())
                    .at_line(idx + 1),
            );
        }

        partial
            .symbols
            .sort_by_key(|s| s.line.unwrap_or(usize::MAX));
        Ok(partial)
    }

    fn summarize(&self, partial: &PartialFileRecord, content: &str, path: &str) -> String {
        if !partial.schemas.is_empty() {
            return format!("{} defined", text::plural(partial.schemas.len(), "table"));
        }
        let altered: Vec<String> = ALTER_TABLE
            .captures_iter(content)
            .map(|caps| unquote(&caps[1]))
            .fold(Vec::new(), |mut seen, name| {
                if !seen.contains(&name) {
                    seen.push(name);
                }
                seen
            });
        if !altered.is_empty() {
            return format!("Alters {}", text::plural(altered.len(), "table"));
        }
        default_summary(partial, content, path, &["--", "/*", "*"])
    }
}

/// Content with `--` comments blanked out, line structure preserved.
fn strip_line_comments(content: &str) -> String {
    content
        .lines()
        .map(|line| match line.find("--") {
            Some(pos) if !in_quotes(&line[..pos]) => &line[..pos],
            _ => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn in_quotes(prefix: &str) -> bool {
    prefix.matches('\'').count() % 2 == 1
}

fn line_index(content: &str, offset: usize) -> usize {
    content[..offset].matches('\n').count()
}

/// `"public"."Users"` → `Users`
fn unquote(name: &str) -> String {
    let last = name.rsplit('.').next().unwrap_or(name);
    last.trim_matches(|c| c == '"' || c == '`' || c == '[' || c == ']')
        .to_string()
}

/// Column definitions of a `CREATE TABLE` body.
fn columns(body: &str) -> (Vec<SchemaField>, Vec<SchemaRelation>) {
    let mut fields = Vec::new();
    let mut relations = Vec::new();

    for definition in split_definitions(body) {
        let Some(first) = definition.split_whitespace().next() else {
            continue;
        };
        let upper = definition.to_ascii_uppercase();

        if CONSTRAINT_KEYWORDS.contains(&first.to_ascii_uppercase().as_str()) {
            if let (Some(column), Some(target)) =
                (FOREIGN_KEY.captures(&definition), REFERENCES.captures(&definition))
            {
                relations.push(SchemaRelation {
                    field: unquote(&column[1]),
                    target: unquote(&target[1]),
                });
            }
            continue;
        }

        let name = unquote(first);
        let ty = column_type(definition[first.len()..].trim_start());
        let nullable = !(upper.contains("NOT NULL") || upper.contains("PRIMARY KEY"));
        if let Some(target) = REFERENCES.captures(&definition) {
            relations.push(SchemaRelation {
                field: name.clone(),
                target: unquote(&target[1]),
            });
        }
        fields.push(SchemaField::new(name, ty, nullable));
    }

    (fields, relations)
}

/// Leading type of a column definition, with its arguments: `NUMERIC(10,2)`.
fn column_type(rest: &str) -> String {
    let mut depth = 0i32;
    let end = rest
        .char_indices()
        .find(|&(_, c)| {
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            c.is_whitespace() && depth == 0
        })
        .map_or(rest.len(), |(i, _)| i);
    rest[..end].replace(' ', "")
}

/// Split on commas outside parentheses and quotes.
fn split_definitions(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quoted = false;

    for c in body.chars() {
        match c {
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => depth -= 1,
            ',' if !quoted && depth == 0 => {
                let piece = current.trim();
                if !piece.is_empty() {
                    parts.push(piece.to_string());
                }
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    let piece = current.trim();
    if !piece.is_empty() {
        parts.push(piece.to_string());
    }
    parts
}
