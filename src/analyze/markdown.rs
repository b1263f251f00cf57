use once_cell::sync::Lazy;
use regex::Regex;

use super::{text, AnalyzeError, Analyzer};
use crate::model::{PartialFileRecord, SymbolKind, SymbolRecord};

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*#*\s*$").expect("Invalid heading regex"));

static API_DOCS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(api|endpoints?)\b").expect("Invalid api-docs regex"));

/// Headings and document-type detectors for Markdown files.
pub struct MarkdownAnalyzer;

impl Analyzer for MarkdownAnalyzer {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn extract(&self, content: &str, path: &str) -> Result<PartialFileRecord, AnalyzeError> {
        let mut partial = PartialFileRecord::default();
        let file_name = path.rsplit('/').next().unwrap_or(path).to_ascii_lowercase();

        if file_name.starts_with("readme") {
            partial.add_detector("readme");
        }
        if file_name.starts_with("changelog") || file_name.starts_with("history") {
            partial.add_detector("changelog");
        }

        let mut in_fence = false;
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                in_fence = !in_fence;
                continue;
            }
            if in_fence {
                continue;
            }
            if let Some(caps) = HEADING.captures(line) {
                let title = &caps[2];
                partial.symbols.push(
                    SymbolRecord::new(SymbolKind::Section, title)
                        .with_detail(format!("level {}", caps[1].len()))
                        .at_line(idx + 1),
                );
                if API_DOCS.is_match(title) {
                    partial.add_detector("api-docs");
                }
            }
        }

        Ok(partial)
    }

    fn summarize(&self, partial: &PartialFileRecord, content: &str, _path: &str) -> String {
        let mut in_fence = false;
        for line in content.lines().map(str::trim) {
            if line.starts_with("```") || line.starts_with("~~~") {
                in_fence = !in_fence;
                continue;
            }
            if in_fence || line.is_empty() || is_decoration(line) {
                continue;
            }
            return text::truncate_chars(line, 80);
        }
        text::plural(partial.count(SymbolKind::Section), "section")
    }
}

/// Headings, badges, images, rules and HTML wrappers carry no prose.
fn is_decoration(line: &str) -> bool {
    line.starts_with('#')
        || line.starts_with("[![")
        || line.starts_with("![")
        || line.starts_with('<')
        || line.starts_with("---")
        || line.starts_with("===")
}

#[cfg(test)]
mod tests {
    use super::*;

    const README: &str = "# Shop API\n\n[![build](https://ci/badge.svg)](https://ci)\n\nBackend for the storefront.\n\n## API Endpoints\n\n```bash\n# not a heading\ncurl /users\n```\n\n### Setup ###\n";

    #[test]
    fn test_headings_outside_fences() {
        let partial = MarkdownAnalyzer.extract(README, "README.md").unwrap();
        let sections: Vec<(&str, Option<&str>, Option<usize>)> = partial
            .symbols
            .iter()
            .map(|s| (s.name.as_str(), s.detail.as_deref(), s.line))
            .collect();
        assert_eq!(
            sections,
            vec![
                ("Shop API", Some("level 1"), Some(1)),
                ("API Endpoints", Some("level 2"), Some(7)),
                ("Setup", Some("level 3"), Some(14)),
            ]
        );
        assert_eq!(partial.detectors, vec!["readme", "api-docs"]);
    }

    #[test]
    fn test_summary_skips_badges() {
        let partial = MarkdownAnalyzer.extract(README, "README.md").unwrap();
        assert_eq!(
            MarkdownAnalyzer.summarize(&partial, README, "README.md"),
            "Backend for the storefront."
        );
    }

    #[test]
    fn test_summary_falls_back_to_section_count() {
        let src = "# Changelog\n\n## 1.0.0\n";
        let partial = MarkdownAnalyzer.extract(src, "docs/CHANGELOG.md").unwrap();
        assert_eq!(partial.detectors, vec!["changelog"]);
        assert_eq!(
            MarkdownAnalyzer.summarize(&partial, src, "docs/CHANGELOG.md"),
            "2 sections"
        );
    }
}
