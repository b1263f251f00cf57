//! Fallback analyzer: a summary line and the extension as detector.

use super::{language_tag, text, AnalyzeError, Analyzer};
use crate::model::PartialFileRecord;

pub struct GenericAnalyzer;

impl Analyzer for GenericAnalyzer {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn extract(&self, _content: &str, path: &str) -> Result<PartialFileRecord, AnalyzeError> {
        let mut partial = PartialFileRecord::default();
        let tag = language_tag(path);
        partial.add_detector(if tag.is_empty() { "unknown".to_string() } else { tag });
        Ok(partial)
    }

    fn summarize(&self, _partial: &PartialFileRecord, content: &str, _path: &str) -> String {
        text::first_content_line(content, &[])
            .unwrap_or_else(|| text::plural(content.lines().count(), "line"))
    }
}
