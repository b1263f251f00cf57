//! Rule-based symbol descriptions.
//!
//! A description comes from the first rule in [`RULES`] that yields text:
//!
//! 1. `preceding-comment` - a doc or line comment directly above the symbol
//! 2. `naming-pattern` - verb prefix glossary (`getUser` → "Retrieves user")
//! 3. `body-context` - idioms mentioned in the first lines of the body
//! 4. `fallback` - formatted name and kind, always succeeds
//!
//! Rules never combine; each one is a pure function of [`SymbolContext`] and
//! can be tested on its own.

use crate::analyze::text::{format_identifier, indent_of, split_identifier, truncate_chars};
use crate::model::SymbolKind;

/// Lines of body scanned by the context rule.
const BODY_SCAN_LINES: usize = 20;

/// Lines above a symbol searched for a comment.
const COMMENT_LOOKBACK: usize = 5;

/// How a language delimits function bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    /// `{ ... }` (JS/TS, Java, C#)
    Braces,
    /// Indentation (Python)
    Indent,
}

/// Everything a rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct SymbolContext<'a> {
    pub name: &'a str,
    pub kind: SymbolKind,
    pub params: &'a [String],
    /// All lines of the file
    pub lines: &'a [&'a str],
    /// 0-indexed declaration line
    pub line_index: usize,
    pub style: BlockStyle,
}

pub struct DescriptionRule {
    pub name: &'static str,
    pub applies: fn(&SymbolContext) -> bool,
    pub generate: fn(&SymbolContext) -> Option<String>,
}

/// The cascade, in priority order.
pub const RULES: &[DescriptionRule] = &[
    DescriptionRule {
        name: "preceding-comment",
        applies: |ctx| ctx.line_index > 0,
        generate: |ctx| preceding_comment(ctx.lines, ctx.line_index),
    },
    DescriptionRule {
        name: "naming-pattern",
        applies: |ctx| !ctx.name.is_empty(),
        generate: naming_pattern,
    },
    DescriptionRule {
        name: "body-context",
        applies: |ctx| ctx.line_index < ctx.lines.len(),
        generate: body_context,
    },
    DescriptionRule {
        name: "fallback",
        applies: |_| true,
        generate: |ctx| Some(fallback(ctx)),
    },
];

/// Run the cascade for one symbol.
pub fn describe(ctx: &SymbolContext) -> String {
    RULES
        .iter()
        .filter(|rule| (rule.applies)(ctx))
        .find_map(|rule| (rule.generate)(ctx).filter(|text| !text.is_empty()))
        .unwrap_or_else(|| fallback(ctx))
}

/// Comment text directly above `line_index`.
///
/// Skips blank lines, decorators/annotations and TODO-style markers. Stops
/// at the first line of code.
pub fn preceding_comment(lines: &[&str], line_index: usize) -> Option<String> {
    let start = line_index.min(lines.len());
    for idx in (start.saturating_sub(COMMENT_LOOKBACK)..start).rev() {
        let line = lines[idx].trim();
        if line.is_empty() || is_annotation(line) {
            continue;
        }

        let text = comment_text(line)?;
        let text = text.trim();
        if text.is_empty() || text.starts_with('@') || is_marker(text) {
            continue;
        }
        return Some(truncate_chars(text, 100));
    }
    None
}

/// Comment body of `line`, or `None` when the line is code.
fn comment_text(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix("///") {
        return Some(rest);
    }
    if let Some(rest) = line.strip_prefix("//") {
        return Some(rest);
    }
    if line.starts_with("#!") || line.starts_with("#[") {
        return None;
    }
    if let Some(rest) = line.strip_prefix('#') {
        return Some(rest);
    }
    if line.starts_with("/*") || line.starts_with('*') || line.ends_with("*/") {
        let text = line
            .trim_start_matches("/**")
            .trim_start_matches("/*")
            .trim_end_matches("*/")
            .trim_start_matches('*');
        return Some(text);
    }
    if let Some(rest) = line.strip_prefix("\"\"\"") {
        return Some(rest.trim_end_matches("\"\"\""));
    }
    None
}

fn is_annotation(line: &str) -> bool {
    line.starts_with('@') || (line.starts_with('[') && line.ends_with(']'))
}

fn is_marker(text: &str) -> bool {
    let upper = text.trim_start_matches(':').trim().to_ascii_uppercase();
    ["TODO", "FIXME", "HACK", "XXX"]
        .iter()
        .any(|marker| upper.starts_with(marker))
}

/// Verb prefixes and their gloss, checked in order.
const VERB_GLOSSARY: &[(&str, &str)] = &[
    ("deserialize", "Deserializes"),
    ("serialize", "Serializes"),
    ("initialize", "Initializes"),
    ("normalize", "Normalizes"),
    ("transform", "Transforms"),
    ("calculate", "Calculates"),
    ("generate", "Generates"),
    ("validate", "Validates"),
    ("convert", "Converts"),
    ("compute", "Computes"),
    ("confirm", "Confirms"),
    ("destroy", "Destroys"),
    ("display", "Displays"),
    ("execute", "Executes"),
    ("process", "Processes"),
    ("handle", "Handles"),
    ("render", "Renders"),
    ("modify", "Modifies"),
    ("update", "Updates"),
    ("delete", "Deletes"),
    ("remove", "Removes"),
    ("create", "Creates"),
    ("insert", "Inserts"),
    ("select", "Selects"),
    ("search", "Searches for"),
    ("ensure", "Ensures"),
    ("verify", "Verifies"),
    ("format", "Formats"),
    ("encode", "Encodes"),
    ("decode", "Decodes"),
    ("toggle", "Toggles"),
    ("change", "Changes"),
    ("setup", "Sets up"),
    ("fetch", "Fetches"),
    ("query", "Queries"),
    ("build", "Builds"),
    ("check", "Checks"),
    ("parse", "Parses"),
    ("clear", "Clears"),
    ("reset", "Resets"),
    ("start", "Starts"),
    ("close", "Closes"),
    ("load", "Loads"),
    ("read", "Reads"),
    ("find", "Finds"),
    ("make", "Makes"),
    ("edit", "Edits"),
    ("test", "Tests"),
    ("show", "Shows"),
    ("hide", "Hides"),
    ("open", "Opens"),
    ("stop", "Stops"),
    ("init", "Initializes"),
    ("calc", "Calculates"),
    ("get", "Retrieves"),
    ("set", "Sets"),
    ("add", "Adds"),
    ("new", "Creates new"),
    ("run", "Runs"),
    ("use", "Hook for"),
    ("on", "Handles"),
];

/// Parameter names that say nothing about the subject.
const NOISE_PARAMS: &[&str] = &["req", "res", "next", "e", "event", "_", "self", "cls", "ctx"];

fn naming_pattern(ctx: &SymbolContext) -> Option<String> {
    let name = ctx.name.trim_start_matches('_');

    if ctx.kind == SymbolKind::Component {
        return Some(format!("React component for {}", words(name)));
    }

    if ctx.kind == SymbolKind::Class {
        return class_pattern(name);
    }

    let lower = name.to_ascii_lowercase();
    let (verb, gloss) = VERB_GLOSSARY.iter().find(|(verb, _)| {
        lower.starts_with(verb)
            && name[verb.len()..]
                .chars()
                .next()
                .map(|c| c.is_uppercase() || c.is_ascii_digit() || c == '_')
                .unwrap_or(true)
    })?;

    let remainder = words(name[verb.len()..].trim_start_matches('_'));
    let subject = if !remainder.is_empty() {
        remainder
    } else if let Some(param) = meaningful_param(ctx.params) {
        words(param)
    } else {
        match *verb {
            "use" => "state management".to_string(),
            "handle" | "on" => "event".to_string(),
            _ => "data".to_string(),
        }
    };

    Some(format!("{} {}", gloss, subject))
}

fn class_pattern(name: &str) -> Option<String> {
    let lower = name.to_ascii_lowercase();
    let strip = |suffix: &str| words(&name[..name.len() - suffix.len()]);

    if lower.ends_with("service") && lower.len() > 7 {
        Some(format!("Service class for {}", strip("service")))
    } else if lower.ends_with("manager") && lower.len() > 7 {
        Some(format!("Manages {}", strip("manager")))
    } else if lower.ends_with("helper") && lower.len() > 6 {
        Some(format!("Helper functions for {}", strip("helper")))
    } else if lower.ends_with("utils") && lower.len() > 5 {
        Some(format!("Utility functions for {}", strip("utils")))
    } else if lower.ends_with("util") && lower.len() > 4 {
        Some(format!("Utility functions for {}", strip("util")))
    } else {
        None
    }
}

fn meaningful_param(params: &[String]) -> Option<&str> {
    params
        .iter()
        .map(|p| p.trim_start_matches("...").trim_start_matches('*'))
        .find(|p| {
            !p.is_empty()
                && !p.starts_with('{')
                && !p.starts_with('[')
                && !NOISE_PARAMS.contains(p)
        })
}

fn words(name: &str) -> String {
    split_identifier(name).join(" ")
}

/// First lines of the symbol's body, lowercased.
fn body_text(ctx: &SymbolContext) -> String {
    let lines = ctx.lines;
    let start = ctx.line_index;
    let mut body = Vec::new();

    match ctx.style {
        BlockStyle::Braces => {
            let mut depth = 0i32;
            let mut opened = false;
            for line in lines.iter().skip(start).take(BODY_SCAN_LINES) {
                body.push(*line);
                depth += crate::analyze::text::brace_delta(line);
                opened |= line.contains('{');
                if opened && depth <= 0 {
                    break;
                }
            }
        }
        BlockStyle::Indent => {
            let base = indent_of(lines[start]);
            body.push(lines[start]);
            for line in lines.iter().skip(start + 1).take(BODY_SCAN_LINES - 1) {
                if !line.trim().is_empty() && indent_of(line) <= base {
                    break;
                }
                body.push(*line);
            }
        }
    }

    body.join("\n").to_lowercase()
}

fn body_context(ctx: &SymbolContext) -> Option<String> {
    let body = body_text(ctx);
    let has = |needle: &str| body.contains(needle);
    let any = |needles: &[&str]| needles.iter().any(|n| body.contains(n));

    let text = if has(".map(") && has("return") {
        "Maps over a collection and returns transformed items"
    } else if any(&["fetch(", "axios", "http.", "requests.", "httpclient"]) {
        if any(&[".post(", "'post'", "\"post\""]) {
            "Sends data to an API endpoint"
        } else if any(&[".put(", "'put'", "\"put\"", ".patch(", "'patch'", "\"patch\""]) {
            "Updates data through an API"
        } else if any(&[".delete(", "'delete'", "\"delete\""]) {
            "Deletes data through an API"
        } else {
            "Fetches data from an API"
        }
    } else if any(&["usestate(", "setstate("]) {
        "Manages component state"
    } else if has("useeffect(") {
        "Runs side effects after render"
    } else if any(&[
        "prisma.",
        "db.",
        "database",
        ".query(",
        "select ",
        "insert into",
        "session.add",
        ".save(",
    ]) {
        "Reads or writes the database"
    } else if any(&["validate", "schema", "joi.", "yup.", "zod"]) {
        "Validates input data"
    } else if any(&["encrypt", "decrypt", "bcrypt", "crypto.", "hash("]) {
        "Handles encryption or hashing"
    } else if has("next(") && has("req") && has("res") {
        "Middleware for the request pipeline"
    } else if any(&["socket", "websocket", ".emit("]) {
        "Handles real-time socket messages"
    } else if any(&["email", "sendmail", "smtp", "nodemailer"]) {
        "Sends email"
    } else if any(&["upload", "multer", "formdata"]) {
        "Handles file uploads"
    } else {
        return None;
    };
    Some(text.to_string())
}

fn fallback(ctx: &SymbolContext) -> String {
    let mut text = format!("{} {}", format_identifier(ctx.name), ctx.kind);
    if !ctx.params.is_empty() {
        text.push_str(&format!(" ({})", ctx.params.join(", ")));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(
        name: &'a str,
        kind: SymbolKind,
        params: &'a [String],
        lines: &'a [&'a str],
        line_index: usize,
    ) -> SymbolContext<'a> {
        SymbolContext {
            name,
            kind,
            params,
            lines,
            line_index,
            style: BlockStyle::Braces,
        }
    }

    #[test]
    fn test_rule_order() {
        let names: Vec<&str> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec!["preceding-comment", "naming-pattern", "body-context", "fallback"]
        );
    }

    #[test]
    fn test_line_comment_wins() {
        let lines = ["// Loads the user list", "function getUsers() {", "}"];
        let c = ctx("getUsers", SymbolKind::Function, &[], &lines, 1);
        assert_eq!(describe(&c), "Loads the user list");
    }

    #[test]
    fn test_jsdoc_block_skips_tags() {
        let lines = [
            "/**",
            " * Looks up a user by id.",
            " * @param id the id",
            " */",
            "export function findUser(id) {",
        ];
        assert_eq!(
            preceding_comment(&lines, 4).as_deref(),
            Some("Looks up a user by id.")
        );
    }

    #[test]
    fn test_todo_marker_is_skipped() {
        let lines = ["// TODO: rename", "function getUsers() {", "}"];
        let c = ctx("getUsers", SymbolKind::Function, &[], &lines, 1);
        assert_eq!(describe(&c), "Retrieves users");
    }

    #[test]
    fn test_comment_scan_stops_at_code() {
        let lines = ["// About x", "const x = 1;", "function run() {}"];
        assert_eq!(preceding_comment(&lines, 2), None);
    }

    #[test]
    fn test_decorator_between_comment_and_def() {
        let lines = ["# List all users", "@app.route('/users')", "def list_users():"];
        assert_eq!(
            preceding_comment(&lines, 2).as_deref(),
            Some("List all users")
        );
    }

    #[test]
    fn test_verb_prefix_needs_word_boundary() {
        let lines = ["function settings() {}"];
        let c = ctx("settings", SymbolKind::Function, &[], &lines, 0);
        assert_eq!(naming_pattern(&c), None);

        let c = ctx("setupRoutes", SymbolKind::Function, &[], &lines, 0);
        assert_eq!(naming_pattern(&c).as_deref(), Some("Sets up routes"));

        let c = ctx("load_config", SymbolKind::Function, &[], &lines, 0);
        assert_eq!(naming_pattern(&c).as_deref(), Some("Loads config"));
    }

    #[test]
    fn test_empty_remainder_uses_param_then_default() {
        let lines = ["x"];
        let params = vec!["req".to_string(), "order".to_string()];
        let c = ctx("validate", SymbolKind::Function, &params, &lines, 0);
        assert_eq!(naming_pattern(&c).as_deref(), Some("Validates order"));

        let c = ctx("handle", SymbolKind::Function, &[], &lines, 0);
        assert_eq!(naming_pattern(&c).as_deref(), Some("Handles event"));

        let c = ctx("use", SymbolKind::Hook, &[], &lines, 0);
        assert_eq!(naming_pattern(&c).as_deref(), Some("Hook for state management"));
    }

    #[test]
    fn test_component_and_class_patterns() {
        let lines = ["x"];
        let c = ctx("UserProfile", SymbolKind::Component, &[], &lines, 0);
        assert_eq!(describe(&c), "React component for user profile");

        let c = ctx("PaymentService", SymbolKind::Class, &[], &lines, 0);
        assert_eq!(describe(&c), "Service class for payment");
    }

    #[test]
    fn test_body_context_networking() {
        let lines = [
            "async function sync(user) {",
            "  await axios.post('/api/users', user);",
            "}",
        ];
        let params = vec!["user".to_string()];
        let c = ctx("sync", SymbolKind::Function, &params, &lines, 0);
        assert_eq!(describe(&c), "Sends data to an API endpoint");
    }

    #[test]
    fn test_body_context_indent_style() {
        let lines = [
            "def persist(item):",
            "    db.session.add(item)",
            "def other():",
            "    send_email()",
        ];
        let params = vec!["item".to_string()];
        let c = SymbolContext {
            name: "persist",
            kind: SymbolKind::Function,
            params: &params,
            lines: &lines,
            line_index: 0,
            style: BlockStyle::Indent,
        };
        assert_eq!(describe(&c), "Reads or writes the database");
    }

    #[test]
    fn test_fallback_includes_params() {
        let lines = ["function tally(a, b) { return a + b; }"];
        let params = vec!["a".to_string(), "b".to_string()];
        let c = ctx("tally", SymbolKind::Function, &params, &lines, 0);
        assert_eq!(describe(&c), "Tally function (a, b)");
    }
}
