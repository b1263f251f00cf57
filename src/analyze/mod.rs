//! Language-dispatched analyzers.
//!
//! Every analyzer is line-oriented pattern matching over the raw text. None
//! of them parse; they are meant to be good enough for a map of the code and
//! each can be swapped for a real parser without touching dispatch or
//! aggregation.
//!
//! # Dispatch
//!
//! The language tag comes from the extension ([`language_tag`]), the tag maps
//! to a [`LanguageFamily`] and the family selects a registered [`Analyzer`].
//! Families without a registered analyzer fall back to [`GenericAnalyzer`].
//! The dispatcher never looks at content.

pub mod generic;
pub mod javascript;
pub mod json;
pub mod jvm;
pub mod markdown;
pub mod python;
pub mod schema;
pub mod sql;
pub mod text;

pub use generic::GenericAnalyzer;
pub use javascript::JavaScriptAnalyzer;
pub use json::JsonAnalyzer;
pub use jvm::JvmAnalyzer;
pub use markdown::MarkdownAnalyzer;
pub use python::PythonAnalyzer;
pub use schema::SchemaAnalyzer;
pub use sql::SqlAnalyzer;

use std::collections::BTreeMap;

use crate::discovery::extension_of;
use crate::model::{PartialFileRecord, SymbolKind};

/// Failure an analyzer reports instead of a partial record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalyzeError {
    /// Content is not valid for its language
    #[error("{0}")]
    Malformed(String),
}

/// One language family's extraction and summary rules.
pub trait Analyzer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Extract symbols, routes, schemas, imports and detectors.
    ///
    /// # Arguments
    /// * `content` - Full file text
    /// * `path` - Relative path (some rules look at directory names)
    fn extract(&self, content: &str, path: &str) -> Result<PartialFileRecord, AnalyzeError>;

    /// Standard pass for files below the important-file bar.
    ///
    /// Yields the same symbols, routes, schemas, imports and detectors as
    /// [`Analyzer::extract`], without cascade descriptions or complexity.
    /// Analyzers that run the description cascade override this to skip it.
    fn extract_standard(
        &self,
        content: &str,
        path: &str,
    ) -> Result<PartialFileRecord, AnalyzeError> {
        self.extract(content, path).map(PartialFileRecord::into_standard)
    }

    /// One-line summary for an extracted record.
    ///
    /// Priority: framework + route count, framework presence,
    /// function/class counts, first non-comment line.
    fn summarize(&self, partial: &PartialFileRecord, content: &str, path: &str) -> String {
        default_summary(partial, content, path, &["//", "#", "/*", "*"])
    }
}

/// Counts, else first content line, else the file name.
pub fn default_summary(
    partial: &PartialFileRecord,
    content: &str,
    path: &str,
    comment_prefixes: &[&str],
) -> String {
    if let Some(summary) = &partial.summary {
        return summary.clone();
    }
    if let Some(counts) = count_summary(partial) {
        return counts;
    }
    text::first_content_line(content, comment_prefixes)
        .unwrap_or_else(|| path.rsplit('/').next().unwrap_or(path).to_string())
}

/// `"3 functions, 1 class"` when there is anything to count.
pub fn count_summary(partial: &PartialFileRecord) -> Option<String> {
    let functions = partial.count(SymbolKind::Function);
    let classes = partial.count(SymbolKind::Class);
    if functions == 0 && classes == 0 {
        return None;
    }
    Some(format!(
        "{}, {}",
        text::plural(functions, "function"),
        text::plural(classes, "class")
    ))
}

/// Families with a dedicated analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LanguageFamily {
    JavaScript,
    Python,
    Jvm,
    Sql,
    Json,
    Schema,
    Markdown,
    Generic,
}

impl LanguageFamily {
    /// Map a language tag to its family.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" | "mts" | "cts" => Self::JavaScript,
            "py" | "pyi" => Self::Python,
            "java" | "cs" => Self::Jvm,
            "sql" => Self::Sql,
            "json" => Self::Json,
            "prisma" | "graphql" | "gql" => Self::Schema,
            "md" | "markdown" | "mdx" => Self::Markdown,
            _ => Self::Generic,
        }
    }
}

/// Language tag for a path: the lowercase extension, or the lowercase file
/// name for extensionless files (`Dockerfile` → `dockerfile`).
pub fn language_tag(path: &str) -> String {
    extension_of(path).unwrap_or_else(|| {
        path.rsplit('/')
            .next()
            .unwrap_or(path)
            .trim_start_matches('.')
            .to_ascii_lowercase()
    })
}

/// Registry from family to analyzer.
pub struct LanguageDispatcher {
    analyzers: BTreeMap<LanguageFamily, Box<dyn Analyzer>>,
    generic: GenericAnalyzer,
}

impl LanguageDispatcher {
    /// Dispatcher with only the generic fallback.
    pub fn empty() -> Self {
        Self {
            analyzers: BTreeMap::new(),
            generic: GenericAnalyzer,
        }
    }

    /// Dispatcher with every built-in analyzer registered.
    pub fn with_builtin() -> Self {
        let mut dispatcher = Self::empty();
        dispatcher.register(LanguageFamily::JavaScript, Box::new(JavaScriptAnalyzer));
        dispatcher.register(LanguageFamily::Python, Box::new(PythonAnalyzer));
        dispatcher.register(LanguageFamily::Jvm, Box::new(JvmAnalyzer));
        dispatcher.register(LanguageFamily::Sql, Box::new(SqlAnalyzer));
        dispatcher.register(LanguageFamily::Json, Box::new(JsonAnalyzer));
        dispatcher.register(LanguageFamily::Schema, Box::new(SchemaAnalyzer));
        dispatcher.register(LanguageFamily::Markdown, Box::new(MarkdownAnalyzer));
        dispatcher
    }

    pub fn register(&mut self, family: LanguageFamily, analyzer: Box<dyn Analyzer>) {
        self.analyzers.insert(family, analyzer);
    }

    /// Analyzer for a language tag, or the generic fallback.
    pub fn analyzer_for(&self, tag: &str) -> &dyn Analyzer {
        match self.analyzers.get(&LanguageFamily::from_tag(tag)) {
            Some(analyzer) => analyzer.as_ref(),
            None => &self.generic,
        }
    }

    /// Fallback for unknown families and for analyzer panics.
    pub fn generic(&self) -> &dyn Analyzer {
        &self.generic
    }
}

impl Default for LanguageDispatcher {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_tag() {
        assert_eq!(language_tag("src/App.TSX"), "tsx");
        assert_eq!(language_tag("Dockerfile"), "dockerfile");
        assert_eq!(language_tag("config/.env"), "env");
        assert_eq!(language_tag("db/schema.prisma"), "prisma");
    }

    #[test]
    fn test_family_mapping() {
        assert_eq!(LanguageFamily::from_tag("tsx"), LanguageFamily::JavaScript);
        assert_eq!(LanguageFamily::from_tag("cs"), LanguageFamily::Jvm);
        assert_eq!(LanguageFamily::from_tag("gql"), LanguageFamily::Schema);
        assert_eq!(LanguageFamily::from_tag("rs"), LanguageFamily::Generic);
    }

    #[test]
    fn test_dispatch_falls_back_to_generic() {
        let dispatcher = LanguageDispatcher::with_builtin();
        assert_eq!(dispatcher.analyzer_for("ts").name(), "javascript");
        assert_eq!(dispatcher.analyzer_for("py").name(), "python");
        assert_eq!(dispatcher.analyzer_for("toml").name(), "generic");

        let empty = LanguageDispatcher::empty();
        assert_eq!(empty.analyzer_for("ts").name(), "generic");
    }

    #[test]
    fn test_count_summary() {
        let mut partial = PartialFileRecord::default();
        assert_eq!(count_summary(&partial), None);
        partial
            .symbols
            .push(crate::model::SymbolRecord::new(SymbolKind::Function, "a"));
        assert_eq!(
            count_summary(&partial).as_deref(),
            Some("1 function, 0 classes")
        );
    }
}
