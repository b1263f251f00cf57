//! JSON analyzer: manifests, compiler configs and plain data files.

use serde_json::Value;

use super::{text, AnalyzeError, Analyzer};
use crate::model::{PartialFileRecord, SymbolKind, SymbolRecord};

/// Top-level keys listed as symbols.
const MAX_KEYS: usize = 20;

/// Dependencies that imply a framework detector.
const DEPENDENCY_DETECTORS: &[(&str, &str)] = &[
    ("react", "react"),
    ("next", "nextjs"),
    ("express", "express"),
    ("@nestjs/core", "nestjs"),
    ("vue", "vue"),
    ("@angular/core", "angular"),
    ("@prisma/client", "prisma"),
    ("mongoose", "mongoose"),
    ("stripe", "stripe"),
    ("axios", "axios"),
    ("socket.io", "socket.io"),
];

pub struct JsonAnalyzer;

impl Analyzer for JsonAnalyzer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn extract(&self, content: &str, path: &str) -> Result<PartialFileRecord, AnalyzeError> {
        let file_name = path.rsplit('/').next().unwrap_or(path).to_ascii_lowercase();
        let json: Value = if allows_comments(&file_name) {
            serde_json::from_str::<Value>(&strip_comment_lines(content))
        } else {
            serde_json::from_str::<Value>(content)
        }
        .map_err(|e| AnalyzeError::Malformed(e.to_string()))?;

        let mut partial = PartialFileRecord::default();

        if file_name == "package.json" {
            partial.add_detector("npm-package");
            if json.get("contributes").is_some()
                || json.pointer("/engines/vscode").is_some()
            {
                partial.add_detector("vscode-extension");
            }
            let name = json.get("name").and_then(Value::as_str).unwrap_or("package");
            let version = json.get("version").and_then(Value::as_str).unwrap_or("?");
            partial.summary = Some(format!("{} v{}", name, version));

            if let Some(deps) = json.get("dependencies").and_then(Value::as_object) {
                for dep in deps.keys() {
                    partial.add_reference(dep.clone());
                    if let Some((_, tag)) = DEPENDENCY_DETECTORS.iter().find(|(d, _)| *d == dep.as_str()) {
                        partial.add_detector(*tag);
                    }
                }
            }
        } else if file_name.starts_with("tsconfig") || file_name.starts_with("jsconfig") {
            partial.add_detector("typescript-config");
            partial.summary = Some("TypeScript configuration".to_string());
        } else if file_name.contains("config") {
            partial.add_detector("config");
            partial.summary = Some("Configuration file".to_string());
        }

        if let Value::Object(map) = &json {
            for (key, value) in map.iter().take(MAX_KEYS) {
                partial.symbols.push(
                    SymbolRecord::new(SymbolKind::Variable, key.clone())
                        .with_detail(json_type(value)),
                );
            }
        }

        if partial.summary.is_none() {
            partial.summary = Some(match &json {
                Value::Object(map) => format!("JSON object with {}", text::plural(map.len(), "key")),
                Value::Array(items) => {
                    format!("JSON array with {}", text::plural(items.len(), "item"))
                }
                other => format!("JSON {}", json_type(other)),
            });
        }

        Ok(partial)
    }

    fn summarize(&self, partial: &PartialFileRecord, _content: &str, path: &str) -> String {
        partial
            .summary
            .clone()
            .unwrap_or_else(|| path.rsplit('/').next().unwrap_or(path).to_string())
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Files conventionally written as JSON with comments.
fn allows_comments(file_name: &str) -> bool {
    file_name.starts_with("tsconfig")
        || file_name.starts_with("jsconfig")
        || file_name == "settings.json"
        || file_name == "launch.json"
        || file_name == "devcontainer.json"
}

fn strip_comment_lines(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}
