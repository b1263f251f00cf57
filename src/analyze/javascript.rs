//! JavaScript / TypeScript analyzer.
//!
//! Covers `js jsx mjs cjs ts tsx`. Extraction is a single pass over the
//! lines with a running brace depth, which is what lets methods be told
//! apart from nested functions.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{default_summary, text, AnalyzeError, Analyzer};
use crate::describe::{self, BlockStyle, SymbolContext};
use crate::model::{
    ExportRecord, ImportRecord, PartialFileRecord, RouteRecord, SchemaField, SchemaKind,
    SchemaRecord, SymbolKind, SymbolRecord,
};

/// Lines searched above a JSX return for the component declaration.
const COMPONENT_LOOKBACK: usize = 10;

/// Lines a multi-line route registration or import may span.
const STATEMENT_SPAN: usize = 10;

/// Lines scanned for a function body when computing complexity.
const COMPLEXITY_SPAN: usize = 200;

/// Regex patterns for JS/TS extraction, compiled once.
mod js_patterns {
    use super::*;

    /// Framework and library fingerprints, in report order.
    pub static DETECTORS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
        [
            (
                "react",
                r#"from\s+['"]react['"]|require\(\s*['"]react['"]\s*\)|\bReact\.|\buse(?:State|Effect|Context|Reducer|Ref|Memo|Callback)\s*\("#,
            ),
            (
                "nextjs",
                r#"from\s+['"]next(?:/[\w/-]+)?['"]|getServerSideProps|getStaticProps|\bNextResponse\b|\bNextRequest\b"#,
            ),
            (
                "express",
                r#"require\(\s*['"]express['"]\s*\)|from\s+['"]express['"]|express\.Router\s*\(|\bexpress\(\s*\)"#,
            ),
            ("nestjs", r#"from\s+['"]@nestjs/|@Controller\(|@Injectable\("#),
            ("vue", r#"from\s+['"]vue['"]|\bdefineComponent\s*\("#),
            ("angular", r#"from\s+['"]@angular/"#),
            ("prisma", r#"@prisma/client|\bPrismaClient\b"#),
            ("mongoose", r#"['"]mongoose['"]|\bmongoose\.|\bnew\s+Schema\s*\("#),
            ("stripe", r#"['"]stripe['"]|\bStripe\s*\("#),
            ("axios", r#"['"]axios['"]|\baxios\."#),
            ("socket.io", r#"socket\.io"#),
            (
                "vscode-extension",
                r#"from\s+['"]vscode['"]|require\(\s*['"]vscode['"]\s*\)|\bvscode\.(?:commands|window|workspace)\b"#,
            ),
            (
                "tests",
                r#"\b(?:describe|it|test)\s*\(\s*['"`]|\bexpect\s*\("#,
            ),
            ("middleware", r#"\.use\s*\("#),
            (
                "api-routes",
                r#"\.(?:get|post|put|delete|patch)\s*\(\s*['"`]/"#,
            ),
        ]
        .into_iter()
        .map(|(tag, pattern)| (tag, Regex::new(pattern).expect("Invalid JS detector regex")))
        .collect()
    });

    /// `function foo(a, b)`, `export async function* gen()`
    pub static FUNCTION: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\s*\(([^)]*)\)?",
        )
        .expect("Invalid JS function regex")
    });

    /// `const foo = async (a, b) =>`, `let bar = x =>`
    pub static ARROW: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:<[^>]*>\s*)?(?:\(([^)]*)\)?|([A-Za-z_$][\w$]*))\s*(?::\s*[^=]+)?=>",
        )
        .expect("Invalid JS arrow regex")
    });

    /// `const foo = function (a) {`
    pub static FUNCTION_EXPR: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?function\b\s*\*?\s*[\w$]*\s*\(([^)]*)\)?",
        )
        .expect("Invalid JS function expression regex")
    });

    /// `class Foo extends Bar`
    pub static CLASS: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][\w$]*)(?:\s*<[^>]*>)?(?:\s+extends\s+([A-Za-z_$][\w$.]*))?",
        )
        .expect("Invalid JS class regex")
    });

    /// Method declaration at class-body depth: `async save(user) {`
    pub static METHOD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^(?:(?:public|private|protected|static|async|readonly|override|abstract|get|set)\s+)*\*?\s*([A-Za-z_$#][\w$]*)\s*(?:<[^>]*>)?\s*\(([^)]*)\)?[^;]*?\{?\s*$",
        )
        .expect("Invalid JS method regex")
    });

    /// Arrow function class property: `handleClick = (e) => {`
    pub static CLASS_PROPERTY_ARROW: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^(?:(?:public|private|protected|static|readonly)\s+)*([A-Za-z_$#][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:\(([^)]*)\)|([A-Za-z_$][\w$]*))\s*(?::\s*[^=]+)?=>",
        )
        .expect("Invalid JS class property regex")
    });

    /// `type Foo = ...`
    pub static TYPE_ALIAS: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(?:export\s+)?(?:declare\s+)?type\s+([A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\s*=")
            .expect("Invalid TS type alias regex")
    });

    /// `interface Foo extends Bar {`
    pub static INTERFACE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^(?:export\s+)?(?:declare\s+)?interface\s+([A-Za-z_$][\w$]*)(?:\s*<[^>]*>)?(?:\s+extends\s+([^{]+))?",
        )
        .expect("Invalid TS interface regex")
    });

    /// One interface member: `readonly id?: string`
    pub static INTERFACE_FIELD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"^(?:readonly\s+)?['"]?([\w$]+)['"]?(\?)?\s*:\s*(.+)$"#)
            .expect("Invalid TS interface field regex")
    });

    pub static HOOK_NAME: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^use[A-Z0-9]").expect("Invalid hook name regex"));

    /// A JSX expression being returned on this line.
    pub static JSX_RETURN: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?:\breturn\s*\(?\s*|=>\s*\(?\s*)<(?:[A-Za-z][\w.]*|>)")
            .expect("Invalid JSX return regex")
    });

    /// `return (` with the JSX starting on the next line.
    pub static OPEN_RETURN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?:\breturn|=>)\s*\(\s*$").expect("Invalid open return regex"));

    /// Capitalized declaration that can own a JSX return.
    pub static COMPONENT_DECL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^(?:export\s+)?(?:default\s+)?(?:(?:async\s+)?function\s+([A-Z][\w$]*)|(?:const|let|var)\s+([A-Z][\w$]*)\s*(?::[^=]+)?=|class\s+([A-Z][\w$]*))",
        )
        .expect("Invalid component declaration regex")
    });

    /// `router.get('/users', ...` up to and including the path literal.
    pub static EXPRESS_ROUTE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r#"\b([A-Za-z_$][\w$]*)\.(get|post|put|delete|patch|all|options|head)\s*\(\s*['"`]([^'"`]+)['"`]\s*,?"#,
        )
        .expect("Invalid Express route regex")
    });

    /// App-router handler: `export async function GET(req)`
    pub static NEXT_ROUTE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^export\s+(?:async\s+)?(?:function\s+|const\s+)(GET|POST|PUT|DELETE|PATCH|HEAD|OPTIONS)\b",
        )
        .expect("Invalid Next.js route regex")
    });

    /// `import x, { y } from 'mod'` (statement already joined to one line)
    pub static IMPORT_FROM: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"^import\s+(?:type\s+)?(.+?)\s+from\s+['"]([^'"]+)['"]"#)
            .expect("Invalid import regex")
    });

    /// `import './styles.css'`
    pub static IMPORT_SIDE_EFFECT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"^import\s+['"]([^'"]+)['"]"#).expect("Invalid side-effect import regex")
    });

    /// `const { a } = require('mod')`
    pub static REQUIRE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r#"^(?:const|let|var)\s+(.+?)\s*=\s*(?:await\s+)?require\(\s*['"]([^'"]+)['"]\s*\)"#,
        )
        .expect("Invalid require regex")
    });

    /// `export const foo`, `export class Bar`
    pub static EXPORT_DECL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^export\s+(?:declare\s+)?(?:async\s+)?(function\*?|class|const|let|var|interface|type|enum)\s+([A-Za-z_$][\w$]*)",
        )
        .expect("Invalid export regex")
    });

    pub static EXPORT_DEFAULT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^export\s+default\s+(?:async\s+)?(?:(function\*?|class)\s*)?([A-Za-z_$][\w$]*)?",
        )
        .expect("Invalid default export regex")
    });

    /// `export { a, b as c }`
    pub static EXPORT_LIST: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^export\s+(?:type\s+)?\{([^}]*)\}").expect("Invalid export list regex")
    });

    /// `module.exports = { a, b }` / `module.exports = router`
    pub static MODULE_EXPORTS: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^module\.exports\s*=\s*(?:\{([^}]*)\}?|([A-Za-z_$][\w$]*))")
            .expect("Invalid module.exports regex")
    });

    /// `exports.foo = ...`
    pub static NAMED_EXPORT_ASSIGN: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(?:module\.)?exports\.([A-Za-z_$][\w$]*)\s*=")
            .expect("Invalid exports assignment regex")
    });

    /// Decision points counted toward complexity.
    pub static DECISION: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\b(?:if|for|while|case|catch)\b|&&|\|\|").expect("Invalid decision regex")
    });
}

use js_patterns::*;

/// Keywords that look like method declarations at class depth.
const NOT_METHODS: &[&str] = &[
    "constructor", "if", "for", "while", "switch", "catch", "return", "function", "else", "do",
    "try", "super", "new", "typeof", "await", "throw",
];

/// Receivers whose `.get('/x')` is an HTTP client call, not a registration.
const CLIENT_RECEIVERS: &[&str] = &[
    "axios", "http", "https", "api", "client", "fetch", "ky", "superagent", "$http", "cy",
    "request", "instance",
];

pub struct JavaScriptAnalyzer;

impl Analyzer for JavaScriptAnalyzer {
    fn name(&self) -> &'static str {
        "javascript"
    }

    fn extract(&self, content: &str, path: &str) -> Result<PartialFileRecord, AnalyzeError> {
        Ok(extract_with(content, path, true))
    }

    fn extract_standard(
        &self,
        content: &str,
        path: &str,
    ) -> Result<PartialFileRecord, AnalyzeError> {
        Ok(extract_with(content, path, false))
    }

    fn summarize(&self, partial: &PartialFileRecord, content: &str, path: &str) -> String {
        if !partial.routes.is_empty() {
            let framework = if partial.has_detector("express") {
                "Express API"
            } else if partial.has_detector("nextjs") {
                "Next.js API"
            } else if partial.has_detector("nestjs") {
                "NestJS API"
            } else {
                "API"
            };
            return format!(
                "{} with {}",
                framework,
                text::plural(partial.routes.len(), "route")
            );
        }

        let components = partial.count(SymbolKind::Component);
        if partial.has_detector("react") && components > 0 {
            return format!(
                "React module with {}",
                text::plural(components, "component")
            );
        }

        const PRESENCE: &[(&str, &str)] = &[
            ("vscode-extension", "VS Code extension module"),
            ("nextjs", "Next.js module"),
            ("nestjs", "NestJS module"),
            ("express", "Express server module"),
            ("react", "React module"),
            ("vue", "Vue module"),
            ("angular", "Angular module"),
            ("tests", "Test suite"),
        ];
        if let Some((_, label)) = PRESENCE.iter().find(|(tag, _)| partial.has_detector(tag)) {
            return label.to_string();
        }

        default_summary(
            partial,
            content,
            path,
            &["//", "/*", "*", "import ", "'use ", "\"use "],
        )
    }
}

fn extract_with(content: &str, path: &str, deep: bool) -> PartialFileRecord {
    let lines: Vec<&str> = content.lines().collect();
    let mut extractor = Extractor {
        lines: &lines,
        path,
        deep,
        partial: PartialFileRecord::default(),
    };

    for (tag, pattern) in DETECTORS.iter() {
        if pattern.is_match(content) {
            extractor.partial.add_detector(*tag);
        }
    }

    extractor.scan();
    extractor.finish()
}

struct Extractor<'a> {
    lines: &'a [&'a str],
    path: &'a str,
    /// Run the description cascade and complexity count
    deep: bool,
    partial: PartialFileRecord,
}

impl<'a> Extractor<'a> {
    fn scan(&mut self) {
        let lines = self.lines;
        let route_gate = self.partial.has_detector("express")
            || self.partial.has_detector("nextjs")
            || self.partial.has_detector("api-routes")
            || {
                let lower = self.path.to_ascii_lowercase();
                lower.contains("route") || lower.contains("api")
            };
        let next_route_path = next_route_path(self.path);

        let mut depth = 0i32;
        let mut class_bodies: Vec<i32> = Vec::new();
        let mut pending_class = false;
        let mut in_block_comment = false;
        let mut components: Vec<String> = Vec::new();
        let mut idx = 0;

        while idx < lines.len() {
            let raw = lines[idx];
            let line = raw.trim();

            if in_block_comment {
                if line.contains("*/") {
                    in_block_comment = false;
                }
                idx += 1;
                continue;
            }
            if line.starts_with("/*") && !line.contains("*/") {
                in_block_comment = true;
                idx += 1;
                continue;
            }
            if line.is_empty() || line.starts_with("//") || line.starts_with('*') {
                idx += 1;
                continue;
            }

            if pending_class && line.contains('{') {
                class_bodies.push(depth + 1);
                pending_class = false;
            }
            let in_class_body = class_bodies.last() == Some(&depth);

            // Imports may span lines; consume the whole statement.
            if line.starts_with("import ") || line.starts_with("import{") {
                let (statement, last) = self.join_statement(idx, |s| {
                    s.contains(" from ") || IMPORT_SIDE_EFFECT.is_match(s) || s.ends_with(';')
                });
                self.import_statement(&statement, idx);
                for skipped in &lines[idx..=last] {
                    depth += text::brace_delta(skipped);
                }
                idx = last + 1;
                continue;
            }

            self.require_line(line, idx);
            self.export_line(line, idx);

            if let Some(caps) = CLASS.captures(line) {
                let name = &caps[1];
                let mut symbol = SymbolRecord::new(SymbolKind::Class, name).at_line(idx + 1);
                if let Some(base) = caps.get(2) {
                    symbol = symbol.with_detail(base.as_str());
                }
                self.push_described(symbol, &[], idx);
                if line.contains('{') {
                    class_bodies.push(depth + 1);
                } else {
                    pending_class = true;
                }
            } else if let Some(caps) = INTERFACE.captures(line) {
                self.interface(&caps[1], idx);
            } else if let Some(caps) = TYPE_ALIAS.captures(line) {
                self.partial.symbols.push(
                    SymbolRecord::new(SymbolKind::Type, &caps[1])
                        .with_detail("alias")
                        .at_line(idx + 1),
                );
            } else if let Some(caps) = FUNCTION.captures(line) {
                let params = text::parse_params(caps.get(2).map_or("", |m| m.as_str()));
                self.function(&caps[1], params, idx);
            } else if let Some(caps) = FUNCTION_EXPR.captures(line) {
                let params = text::parse_params(caps.get(2).map_or("", |m| m.as_str()));
                self.function(&caps[1], params, idx);
            } else if let Some(caps) = ARROW.captures(line) {
                let params = match (caps.get(2), caps.get(3)) {
                    (Some(list), _) => text::parse_params(list.as_str()),
                    (None, Some(single)) => vec![single.as_str().to_string()],
                    (None, None) => Vec::new(),
                };
                self.function(&caps[1], params, idx);
            } else if in_class_body {
                self.class_member(line, idx);
            }

            if route_gate {
                if let Some(last) = self.express_route(idx) {
                    for skipped in &lines[idx + 1..=last] {
                        depth += text::brace_delta(skipped);
                    }
                    idx = last;
                }
            }
            if let Some(route_path) = &next_route_path {
                self.next_route(line, route_path, idx);
            }

            let jsx_here = JSX_RETURN.is_match(line)
                || (OPEN_RETURN.is_match(line)
                    && lines
                        .get(idx + 1)
                        .map(|next| next.trim_start().starts_with('<'))
                        .unwrap_or(false));
            if jsx_here {
                self.component(idx, &mut components);
            }

            depth += text::brace_delta(raw);
            while class_bodies.last().is_some_and(|body| depth < *body) {
                class_bodies.pop();
            }
            idx += 1;
        }
    }

    fn finish(mut self) -> PartialFileRecord {
        // symbols are collected out of line order (components, routes)
        self.partial
            .symbols
            .sort_by_key(|s| s.line.unwrap_or(usize::MAX));
        self.partial
    }

    /// Join lines from `start` until `done` holds for the joined text.
    fn join_statement(&self, start: usize, done: impl Fn(&str) -> bool) -> (String, usize) {
        let mut statement = String::new();
        let end = self.lines.len().min(start + STATEMENT_SPAN);
        for idx in start..end {
            if !statement.is_empty() {
                statement.push(' ');
            }
            statement.push_str(self.lines[idx].trim());
            if done(&statement) {
                return (statement, idx);
            }
        }
        (statement, start)
    }

    fn push_described(&mut self, mut symbol: SymbolRecord, params: &[String], idx: usize) {
        if self.deep && symbol.kind.is_describable() {
            let ctx = SymbolContext {
                name: &symbol.name,
                kind: symbol.kind,
                params,
                lines: self.lines,
                line_index: idx,
                style: BlockStyle::Braces,
            };
            symbol.description = Some(describe::describe(&ctx));
        }
        self.partial.symbols.push(symbol);
    }

    fn measured(&self, symbol: SymbolRecord, idx: usize) -> SymbolRecord {
        if self.deep {
            symbol.with_complexity(complexity(self.lines, idx))
        } else {
            symbol
        }
    }

    fn function(&mut self, name: &str, params: Vec<String>, idx: usize) {
        let symbol = SymbolRecord::new(SymbolKind::Function, name)
            .at_line(idx + 1)
            .with_params(params.clone());
        let symbol = self.measured(symbol, idx);
        self.push_described(symbol, &params, idx);

        if HOOK_NAME.is_match(name) {
            let hook = SymbolRecord::new(SymbolKind::Hook, name)
                .at_line(idx + 1)
                .with_params(params.clone());
            self.push_described(hook, &params, idx);
        }
    }

    fn class_member(&mut self, line: &str, idx: usize) {
        let (name, params) = if let Some(caps) = CLASS_PROPERTY_ARROW.captures(line) {
            let params = match (caps.get(2), caps.get(3)) {
                (Some(list), _) => text::parse_params(list.as_str()),
                (None, Some(single)) => vec![single.as_str().to_string()],
                (None, None) => Vec::new(),
            };
            (caps[1].to_string(), params)
        } else if let Some(caps) = METHOD.captures(line) {
            let params = text::parse_params(caps.get(2).map_or("", |m| m.as_str()));
            (caps[1].to_string(), params)
        } else {
            return;
        };

        if NOT_METHODS.contains(&name.as_str()) {
            return;
        }
        let symbol = SymbolRecord::new(SymbolKind::Method, name)
            .at_line(idx + 1)
            .with_params(params.clone());
        let symbol = self.measured(symbol, idx);
        self.push_described(symbol, &params, idx);
    }

    fn interface(&mut self, name: &str, idx: usize) {
        self.partial.symbols.push(
            SymbolRecord::new(SymbolKind::Type, name)
                .with_detail("interface")
                .at_line(idx + 1),
        );

        let Some((body, _)) = text::find_block(self.lines, idx, '{', '}') else {
            return;
        };
        let fields = text::split_top_level(&body, &[';', ',', '\n'])
            .iter()
            .filter_map(|member| INTERFACE_FIELD.captures(member.trim()))
            .map(|caps| {
                let ty = caps[3].trim().trim_end_matches([';', ',']).trim();
                let nullable =
                    caps.get(2).is_some() || ty.contains("| null") || ty.contains("| undefined");
                SchemaField::new(&caps[1], ty, nullable)
            })
            .collect();

        self.partial.schemas.push(SchemaRecord {
            name: name.to_string(),
            kind: SchemaKind::Interface,
            fields,
            relations: Vec::new(),
            line: idx + 1,
        });
    }

    fn component(&mut self, idx: usize, seen: &mut Vec<String>) {
        let start = idx.saturating_sub(COMPONENT_LOOKBACK);
        for decl_idx in (start..=idx).rev() {
            let line = self.lines[decl_idx].trim();
            let Some(caps) = COMPONENT_DECL.captures(line) else {
                continue;
            };
            let Some(name) = caps.get(1).or(caps.get(2)).or(caps.get(3)) else {
                continue;
            };
            let name = name.as_str().to_string();
            if seen.contains(&name) {
                return;
            }
            seen.push(name.clone());
            let symbol = SymbolRecord::new(SymbolKind::Component, &name).at_line(decl_idx + 1);
            self.push_described(symbol, &[], decl_idx);
            return;
        }
    }

    /// Route registration starting on line `idx`.
    ///
    /// Returns the index of the last line the call spans when it runs past
    /// `idx`.
    fn express_route(&mut self, idx: usize) -> Option<usize> {
        let line = self.lines[idx].trim();
        let caps = EXPRESS_ROUTE.captures(line)?;
        let receiver = &caps[1];
        let route_path = &caps[3];
        if CLIENT_RECEIVERS.contains(&receiver) {
            return None;
        }
        if !(route_path.starts_with('/') || route_path == "*") {
            return None;
        }

        let rest_start = caps.get(0).map_or(line.len(), |m| m.end());
        let mut rest = line[rest_start..].to_string();
        let (mut args, mut closed) = text::call_arguments(&rest);
        let mut last = idx;
        while !closed && last + 1 < self.lines.len() && last < idx + STATEMENT_SPAN {
            last += 1;
            rest.push('\n');
            rest.push_str(self.lines[last]);
            (args, closed) = text::call_arguments(&rest);
        }
        let (handler, middleware) = args.split_last()?;

        let mut route = RouteRecord::new(&caps[2], route_path, handler_name(handler), idx + 1);
        route.middleware = middleware.iter().map(|m| handler_name(m)).collect();
        route.description = describe::preceding_comment(self.lines, idx);

        self.partial.symbols.push(
            SymbolRecord::new(SymbolKind::Route, route_path)
                .with_detail(route.method.clone())
                .at_line(idx + 1)
                .with_description(route.description.clone()),
        );
        self.partial.routes.push(route);
        self.partial.add_detector("api-routes");

        (last > idx).then_some(last)
    }

    fn next_route(&mut self, line: &str, route_path: &str, idx: usize) {
        let method = if let Some(caps) = NEXT_ROUTE.captures(line) {
            caps[1].to_string()
        } else if is_pages_api(self.path) && line.starts_with("export default") {
            // pages/api handlers serve every verb
            "ALL".to_string()
        } else {
            return;
        };
        let handler = EXPORT_DEFAULT
            .captures(line)
            .and_then(|caps| caps.get(2).map(|m| m.as_str().to_string()))
            .filter(|_| method == "ALL")
            .unwrap_or_else(|| method.clone());

        let mut route = RouteRecord::new(&method, route_path, handler, idx + 1);
        route.description = describe::preceding_comment(self.lines, idx);
        self.partial.symbols.push(
            SymbolRecord::new(SymbolKind::Route, route_path)
                .with_detail(route.method.clone())
                .at_line(idx + 1)
                .with_description(route.description.clone()),
        );
        self.partial.routes.push(route);
        self.partial.add_detector("nextjs");
    }

    fn import_statement(&mut self, statement: &str, idx: usize) {
        if let Some(caps) = IMPORT_FROM.captures(statement) {
            let binding = caps[1].trim();
            let module = &caps[2];
            self.partial.imports.push(ImportRecord {
                module: module.to_string(),
                items: binding_items(binding),
                is_default: !binding.contains('{'),
                line: idx + 1,
            });
            self.reference(module);
        } else if let Some(caps) = IMPORT_SIDE_EFFECT.captures(statement) {
            let module = &caps[1];
            self.partial.imports.push(ImportRecord {
                module: module.to_string(),
                items: Vec::new(),
                is_default: true,
                line: idx + 1,
            });
            self.reference(module);
        }
    }

    fn require_line(&mut self, line: &str, idx: usize) {
        let Some(caps) = REQUIRE.captures(line) else {
            return;
        };
        let binding = caps[1].trim();
        let module = &caps[2];
        self.partial.imports.push(ImportRecord {
            module: module.to_string(),
            items: binding_items(binding),
            is_default: !binding.contains('{'),
            line: idx + 1,
        });
        self.reference(module);
    }

    fn reference(&mut self, module: &str) {
        if let Some(package) = package_name(module) {
            self.partial.add_reference(package);
        }
    }

    fn export_line(&mut self, line: &str, idx: usize) {
        let exports = &mut self.partial.exports;
        if let Some(caps) = EXPORT_DEFAULT.captures(line) {
            exports.push(ExportRecord {
                name: caps
                    .get(2)
                    .map_or("default", |m| m.as_str())
                    .to_string(),
                kind: caps
                    .get(1)
                    .map_or("default", |m| m.as_str().trim_end_matches('*'))
                    .to_string(),
                is_default: true,
                line: idx + 1,
            });
        } else if let Some(caps) = EXPORT_DECL.captures(line) {
            exports.push(ExportRecord {
                name: caps[2].to_string(),
                kind: caps[1].trim_end_matches('*').to_string(),
                is_default: false,
                line: idx + 1,
            });
        } else if let Some(caps) = EXPORT_LIST.captures(line) {
            for name in export_names(&caps[1]) {
                exports.push(ExportRecord {
                    is_default: name == "default",
                    name,
                    kind: "named".to_string(),
                    line: idx + 1,
                });
            }
        } else if let Some(caps) = MODULE_EXPORTS.captures(line) {
            match (caps.get(1), caps.get(2)) {
                (Some(list), _) => {
                    for name in export_names(list.as_str()) {
                        exports.push(ExportRecord {
                            name,
                            kind: "commonjs".to_string(),
                            is_default: false,
                            line: idx + 1,
                        });
                    }
                }
                (None, Some(single)) => exports.push(ExportRecord {
                    name: single.as_str().to_string(),
                    kind: "commonjs".to_string(),
                    is_default: true,
                    line: idx + 1,
                }),
                (None, None) => {}
            }
        } else if let Some(caps) = NAMED_EXPORT_ASSIGN.captures(line) {
            exports.push(ExportRecord {
                name: caps[1].to_string(),
                kind: "commonjs".to_string(),
                is_default: false,
                line: idx + 1,
            });
        }
    }
}

/// 1 + decision points from the declaration to the end of its body.
fn complexity(lines: &[&str], idx: usize) -> u32 {
    let end = text::block_end(lines, idx, COMPLEXITY_SPAN);
    let decisions: usize = lines[idx..=end]
        .iter()
        .map(|line| DECISION.find_iter(line).count())
        .sum();
    1 + decisions as u32
}

/// Short name for a handler or middleware argument.
fn handler_name(arg: &str) -> String {
    let arg = arg.trim();
    let inline = arg.starts_with('(')
        || arg.starts_with("async")
        || arg.starts_with("function")
        || arg.contains("=>");
    if inline || arg.is_empty() {
        "anonymous".to_string()
    } else {
        text::truncate_chars(arg, 60)
    }
}

/// Names bound by an import or require.
fn binding_items(binding: &str) -> Vec<String> {
    binding
        .split([',', '{', '}'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter_map(|item| {
            let item = item.trim_start_matches("type ").trim();
            if let Some(alias) = item.strip_prefix("* as ") {
                return Some(alias.trim().to_string());
            }
            let name = item.split(" as ").next().unwrap_or(item);
            let name = name.split(':').next().unwrap_or(name).trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

/// Exported names from an `export { ... }` list (the alias when renamed).
fn export_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.rsplit(" as ")
                .next()
                .unwrap_or(item)
                .trim()
                .trim_start_matches("type ")
                .to_string()
        })
        .collect()
}

/// Package a module specifier belongs to; `None` for relative paths.
///
/// `@scope/pkg/sub` → `@scope/pkg`, `lodash/fp` → `lodash`, `node:fs` → `fs`.
fn package_name(module: &str) -> Option<String> {
    if module.starts_with('.') || module.starts_with('/') || module.is_empty() {
        return None;
    }
    let module = module.strip_prefix("node:").unwrap_or(module);
    let mut segments = module.split('/');
    let first = segments.next()?;
    if first.starts_with('@') {
        match segments.next() {
            Some(second) => Some(format!("{}/{}", first, second)),
            None => Some(first.to_string()),
        }
    } else {
        Some(first.to_string())
    }
}

/// URL path served by a Next.js route file, if `path` is one.
///
/// `app/users/[id]/route.ts` → `/users/[id]`, `pages/api/login.ts` →
/// `/api/login`. Route groups like `(auth)` are dropped.
fn next_route_path(path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('/').collect();
    let file = *segments.last()?;
    let stem = file.split('.').next().unwrap_or(file);

    if let Some(app) = segments.iter().position(|s| *s == "app") {
        if stem != "route" {
            return None;
        }
        let parts: Vec<&str> = segments[app + 1..segments.len() - 1]
            .iter()
            .copied()
            .filter(|s| !(s.starts_with('(') && s.ends_with(')')))
            .collect();
        return Some(format!("/{}", parts.join("/")));
    }

    let pages = segments
        .windows(2)
        .position(|pair| pair[0] == "pages" && pair[1] == "api")?;
    let mut parts: Vec<&str> = segments[pages + 1..segments.len() - 1].to_vec();
    if stem != "index" {
        parts.push(stem);
    }
    Some(format!("/{}", parts.join("/")))
}

/// Whether `path` sits under `pages/api`, where a default export is the handler.
fn is_pages_api(path: &str) -> bool {
    path.split('/')
        .collect::<Vec<_>>()
        .windows(2)
        .any(|pair| pair[0] == "pages" && pair[1] == "api")
}
