//! Shared data model for analysis results.
//!
//! Everything here is plain data: analyzers produce [`PartialFileRecord`]s,
//! the scan pipeline turns them into immutable [`FileRecord`]s, and the
//! grouper and report emitter only ever read them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of extracted symbol.
///
/// Closed tag set; new kinds are added as variants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// Free function, arrow function or Python `def`
    Function,
    /// Class, Java/C# interface/enum/record
    Class,
    /// Function declared inside a class body
    Method,
    /// React component
    Component,
    /// React hook (`useSomething`)
    Hook,
    /// Type alias, TypeScript interface, schema enum
    Type,
    /// Top-level binding or config key
    Variable,
    /// HTTP route registration
    Route,
    /// Database table or schema model
    Entity,
    /// Document heading
    Section,
}

impl SymbolKind {
    /// Lowercase tag used in reports and the cache.
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Method => "method",
            SymbolKind::Component => "component",
            SymbolKind::Hook => "hook",
            SymbolKind::Type => "type",
            SymbolKind::Variable => "variable",
            SymbolKind::Route => "route",
            SymbolKind::Entity => "entity",
            SymbolKind::Section => "section",
        }
    }

    /// Whether the description cascade runs for this kind.
    pub fn is_describable(&self) -> bool {
        matches!(
            self,
            SymbolKind::Function
                | SymbolKind::Class
                | SymbolKind::Method
                | SymbolKind::Component
                | SymbolKind::Hook
        )
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted code construct.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymbolRecord {
    pub kind: SymbolKind,
    pub name: String,
    /// Short qualifier (base class, JSON value type, heading level, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// One-line human description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// 1-indexed line of the declaration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<String>>,
    /// 1 + decision points in the body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<u32>,
}

impl SymbolRecord {
    pub fn new(kind: SymbolKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            detail: None,
            description: None,
            line: None,
            params: None,
            complexity: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_params(mut self, params: Vec<String>) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_complexity(mut self, complexity: u32) -> Self {
        self.complexity = Some(complexity);
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}

/// HTTP route registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteRecord {
    /// Uppercase HTTP verb; `GET` when the source does not say
    pub method: String,
    pub path: String,
    pub handler: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub middleware: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub line: usize,
}

impl RouteRecord {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        handler: impl Into<String>,
        line: usize,
    ) -> Self {
        let method = method.into().to_ascii_uppercase();
        Self {
            method: if method.is_empty() {
                "GET".to_string()
            } else {
                method
            },
            path: path.into(),
            handler: handler.into(),
            middleware: Vec::new(),
            description: None,
            line,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    Table,
    Model,
    Interface,
    Type,
}

impl SchemaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::Table => "table",
            SchemaKind::Model => "model",
            SchemaKind::Interface => "interface",
            SchemaKind::Type => "type",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub nullable: bool,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, ty: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            nullable,
        }
    }
}

/// Field-level link from one schema to another.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaRelation {
    pub field: String,
    pub target: String,
}

/// Block-delimited data shape (table, model, interface).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaRecord {
    pub name: String,
    pub kind: SchemaKind,
    pub fields: Vec<SchemaField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<SchemaRelation>,
    pub line: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportRecord {
    /// Module specifier as written (`react`, `./db`, `os.path`)
    pub module: String,
    pub items: Vec<String>,
    /// True unless the binding used a destructuring delimiter
    pub is_default: bool,
    pub line: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportRecord {
    pub name: String,
    /// Declaration keyword (`function`, `class`, `const`, ...)
    pub kind: String,
    pub is_default: bool,
    pub line: usize,
}

/// What a single analyzer pass extracts from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialFileRecord {
    pub symbols: Vec<SymbolRecord>,
    pub routes: Vec<RouteRecord>,
    pub schemas: Vec<SchemaRecord>,
    pub imports: Vec<ImportRecord>,
    pub exports: Vec<ExportRecord>,
    pub detectors: Vec<String>,
    pub references: Vec<String>,
    /// Set when the analyzer already knows the summary (e.g. package.json)
    pub summary: Option<String>,
}

impl PartialFileRecord {
    /// Add a detector tag, keeping first-seen order and no duplicates.
    pub fn add_detector(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.detectors.contains(&tag) {
            self.detectors.push(tag);
        }
    }

    /// Add a reference, keeping first-seen order and no duplicates.
    pub fn add_reference(&mut self, module: impl Into<String>) {
        let module = module.into();
        if !module.is_empty() && !self.references.contains(&module) {
            self.references.push(module);
        }
    }

    pub fn has_detector(&self, tag: &str) -> bool {
        self.detectors.iter().any(|d| d == tag)
    }

    pub fn count(&self, kind: SymbolKind) -> usize {
        self.symbols.iter().filter(|s| s.kind == kind).count()
    }

    /// Drop what only the deep pass computes: cascade descriptions and
    /// complexity. Route descriptions come from comments and stay.
    pub fn into_standard(mut self) -> Self {
        for symbol in &mut self.symbols {
            if symbol.kind.is_describable() {
                symbol.description = None;
            }
            symbol.complexity = None;
        }
        self
    }
}

/// Per-file analysis result. Immutable once emitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    /// Repo-relative, forward slashes
    pub path: String,
    /// Language tag (lowercase extension)
    pub language: String,
    pub hash: String,
    pub bytes: u64,
    pub summary: String,
    pub symbols: Vec<SymbolRecord>,
    pub references: Vec<String>,
    pub detectors: Vec<String>,
    #[serde(default)]
    pub routes: Vec<RouteRecord>,
    #[serde(default)]
    pub schemas: Vec<SchemaRecord>,
    #[serde(default)]
    pub imports: Vec<ImportRecord>,
    #[serde(default)]
    pub exports: Vec<ExportRecord>,
    pub truncated: bool,
    /// Whether the deep pass ran (descriptions and complexity)
    pub deep: bool,
}

/// Caps applied when a partial record becomes a [`FileRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_symbols: usize,
    pub max_refs: usize,
}

impl FileRecord {
    /// Build the final record, enforcing symbol and reference caps.
    ///
    /// Exceeding either cap keeps the first N entries in source order and
    /// sets `truncated`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_partial(
        path: String,
        language: String,
        hash: String,
        bytes: u64,
        summary: String,
        mut partial: PartialFileRecord,
        deep: bool,
        limits: Limits,
    ) -> Self {
        let mut truncated = false;
        if partial.symbols.len() > limits.max_symbols {
            partial.symbols.truncate(limits.max_symbols);
            truncated = true;
        }
        if partial.references.len() > limits.max_refs {
            partial.references.truncate(limits.max_refs);
            truncated = true;
        }

        Self {
            path,
            language,
            hash,
            bytes,
            summary,
            symbols: partial.symbols,
            references: partial.references,
            detectors: partial.detectors,
            routes: partial.routes,
            schemas: partial.schemas,
            imports: partial.imports,
            exports: partial.exports,
            truncated,
            deep,
        }
    }

    /// File name component of the path.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Parent directory, `""` for files at the root.
    pub fn directory(&self) -> &str {
        self.path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Binary,
    Image,
    Migration,
    Test,
    Extension,
}

/// A directory's worth of similar files summarized as one entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileGroup {
    pub directory: String,
    pub kind: GroupKind,
    pub pattern: String,
    pub file_count: usize,
    pub total_bytes: u64,
    pub description: String,
    /// Up to three file names, in path order
    pub samples: Vec<String>,
    /// Every member path; used to keep members out of per-file detail
    pub paths: Vec<String>,
}
