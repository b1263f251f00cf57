//! Python analyzer.
//!
//! Block structure comes from indentation: a stack of open `class`/`def`
//! blocks is popped whenever a line dedents to or past a block's header.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{default_summary, text, AnalyzeError, Analyzer};
use crate::describe::{self, BlockStyle, SymbolContext};
use crate::model::{
    ExportRecord, ImportRecord, PartialFileRecord, RouteRecord, SchemaField, SchemaKind,
    SchemaRecord, SchemaRelation, SymbolKind, SymbolRecord,
};

/// Lines after a route decorator searched for the handler `def`.
const HANDLER_LOOKAHEAD: usize = 5;

/// Lines a parenthesised `from ... import (...)` may span.
const IMPORT_SPAN: usize = 20;

/// Regex patterns for Python extraction, compiled once.
mod py_patterns {
    use super::*;

    pub static DETECTORS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
        [
            ("flask", r"(?m)^\s*(?:from\s+flask\b|import\s+flask\b)|\bFlask\s*\("),
            ("django", r"(?m)^\s*(?:from\s+django\b|import\s+django\b)"),
            ("fastapi", r"(?m)^\s*(?:from\s+fastapi\b|import\s+fastapi\b)|\bFastAPI\s*\("),
            ("sqlalchemy", r"(?m)^\s*(?:from\s+sqlalchemy\b|import\s+sqlalchemy\b)|\bdb\.Column\s*\("),
            ("pydantic", r"(?m)^\s*(?:from\s+pydantic\b|import\s+pydantic\b)"),
            ("pytest", r"(?m)^\s*import\s+pytest\b|^\s*from\s+pytest\b|@pytest\.|^def\s+test_\w+"),
            ("requests", r"(?m)^\s*import\s+requests\b|\brequests\.(?:get|post|put|delete|patch)\s*\("),
            ("pandas", r"(?m)^\s*import\s+pandas\b|^\s*from\s+pandas\b"),
            ("numpy", r"(?m)^\s*import\s+numpy\b|^\s*from\s+numpy\b"),
        ]
        .into_iter()
        .map(|(tag, pattern)| (tag, Regex::new(pattern).expect("Invalid Python detector regex")))
        .collect()
    });

    /// `def name(params)` / `async def name(params)` at any indent
    pub static DEF: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(\s*)(?:async\s+)?def\s+(\w+)\s*\(([^)]*)\)?")
            .expect("Invalid Python def regex")
    });

    /// `class Name(Base1, Base2):`
    pub static CLASS: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(\s*)class\s+(\w+)\s*(?:\(([^)]*)\))?\s*:")
            .expect("Invalid Python class regex")
    });

    /// `@app.route('/x', methods=['GET'])`, `@router.post("/y")`
    pub static ROUTE_DECORATOR: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r#"^\s*@(\w+)\.(route|get|post|put|delete|patch|api_route)\s*\(\s*['"]([^'"]*)['"](.*)$"#,
        )
        .expect("Invalid Python route decorator regex")
    });

    pub static METHODS_ARG: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"methods\s*=\s*[\[(]([^\])]*)[\])]").expect("Invalid methods= regex")
    });

    pub static QUOTED: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#"['"](\w+)['"]"#).expect("Invalid quoted word regex"));

    /// Django URLconf entry: `path('users/', views.user_list)`
    pub static DJANGO_PATH: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"^\s*(?:re_)?path\(\s*r?['"]([^'"]*)['"]\s*,\s*([\w.]+)"#)
            .expect("Invalid Django path regex")
    });

    /// Django model field: `email = models.EmailField(null=True)`
    pub static DJANGO_FIELD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^\s+(\w+)\s*=\s*models\.(\w+)\((.*)$").expect("Invalid Django field regex")
    });

    /// SQLAlchemy column: `id = Column(Integer, ...)`, `name: Mapped[str] = mapped_column(...)`
    pub static SQLALCHEMY_FIELD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^\s+(\w+)\s*(?::\s*Mapped\[([^\]]*)\])?\s*=\s*(?:db\.|sa\.)?(Column|mapped_column|relationship)\((.*)$",
        )
        .expect("Invalid SQLAlchemy field regex")
    });

    pub static FOREIGN_KEY: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"ForeignKey\(\s*['"](\w+)\."#).expect("Invalid ForeignKey regex")
    });

    /// First argument naming a model: `'User'`, `"app.User"` or `User`
    pub static MODEL_ARG: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"^\s*['"]?(?:\w+\.)?(\w+)['"]?"#).expect("Invalid model argument regex")
    });

    pub static IMPORT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^import\s+(.+)$").expect("Invalid import regex"));

    pub static FROM_IMPORT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^from\s+(\.*[\w.]*)\s+import\s+(.+)$").expect("Invalid from-import regex")
    });

    /// `__all__ = ['a', 'b']`
    pub static DUNDER_ALL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^__all__\s*=\s*[\[(](.*)[\])]").expect("Invalid __all__ regex")
    });

    pub static DECISION: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\b(?:if|elif|for|while|except|and|or)\b").expect("Invalid decision regex")
    });
}

use py_patterns::*;

/// Model base classes that make a class a persisted model.
const MODEL_BASES: &[&str] = &["models.Model", "db.Model", "Base", "DeclarativeBase", "Model"];

/// Django field classes that point at another model.
const DJANGO_RELATIONS: &[&str] = &["ForeignKey", "OneToOneField", "ManyToManyField"];

pub struct PythonAnalyzer;

impl Analyzer for PythonAnalyzer {
    fn name(&self) -> &'static str {
        "python"
    }

    fn extract(&self, content: &str, _path: &str) -> Result<PartialFileRecord, AnalyzeError> {
        Ok(extract_with(content, true))
    }

    fn extract_standard(
        &self,
        content: &str,
        _path: &str,
    ) -> Result<PartialFileRecord, AnalyzeError> {
        Ok(extract_with(content, false))
    }

    fn summarize(&self, partial: &PartialFileRecord, content: &str, path: &str) -> String {
        if !partial.routes.is_empty() {
            let framework = if partial.has_detector("fastapi") {
                "FastAPI service"
            } else if partial.has_detector("flask") {
                "Flask API"
            } else if partial.has_detector("django") {
                "Django URLconf"
            } else {
                "API"
            };
            return format!(
                "{} with {}",
                framework,
                text::plural(partial.routes.len(), "route")
            );
        }

        if !partial.schemas.is_empty() {
            let framework = if partial.has_detector("django") {
                "Django"
            } else {
                "SQLAlchemy"
            };
            return format!(
                "{} {}",
                framework,
                text::plural(partial.schemas.len(), "model")
            );
        }

        const PRESENCE: &[(&str, &str)] = &[
            ("pytest", "Test suite"),
            ("fastapi", "FastAPI module"),
            ("flask", "Flask module"),
            ("django", "Django module"),
            ("pydantic", "Pydantic data models"),
            ("pandas", "Data processing with pandas"),
        ];
        if let Some((_, label)) = PRESENCE.iter().find(|(tag, _)| partial.has_detector(tag)) {
            return label.to_string();
        }

        if let Some(doc) = module_docstring(content) {
            return doc;
        }
        default_summary(partial, content, path, &["#", "import ", "from "])
    }
}

fn extract_with(content: &str, deep: bool) -> PartialFileRecord {
    let lines: Vec<&str> = content.lines().collect();
    let mut partial = PartialFileRecord::default();

    for (tag, pattern) in DETECTORS.iter() {
        if pattern.is_match(content) {
            partial.add_detector(*tag);
        }
    }

    let mut blocks: Vec<Block> = Vec::new();
    let mut idx = 0;
    while idx < lines.len() {
        let line = lines[idx];
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            idx += 1;
            continue;
        }

        let indent = text::indent_of(line);
        while blocks.last().is_some_and(|b| b.indent >= indent) {
            blocks.pop();
        }

        if indent == 0 {
            if trimmed.starts_with("from ") && trimmed.contains('(') && !trimmed.contains(')') {
                let end = join_until_close(&lines, idx);
                let joined = lines[idx..=end]
                    .iter()
                    .map(|l| l.trim())
                    .collect::<Vec<_>>()
                    .join(" ");
                import_line(&mut partial, &joined, idx);
                idx = end + 1;
                continue;
            }
            import_line(&mut partial, trimmed, idx);
            dunder_all(&mut partial, trimmed, idx);
        }

        if let Some(caps) = CLASS.captures(line) {
            let name = caps[2].to_string();
            let bases = caps.get(3).map(|m| m.as_str().trim().to_string());
            let mut symbol = SymbolRecord::new(SymbolKind::Class, &name).at_line(idx + 1);
            if let Some(bases) = bases.as_deref().filter(|b| !b.is_empty()) {
                symbol = symbol.with_detail(bases);
            }
            push_described(&mut partial, symbol, &[], &lines, idx, deep);

            if bases.as_deref().is_some_and(is_model_base) {
                model_schema(&mut partial, &name, &lines, idx);
            }
            blocks.push(Block {
                indent,
                is_class: true,
            });
        } else if let Some(caps) = DEF.captures(line) {
            let name = &caps[2];
            let params = text::parse_params(caps.get(3).map_or("", |m| m.as_str()));
            let kind = if blocks.last().is_some_and(|b| b.is_class) {
                SymbolKind::Method
            } else {
                SymbolKind::Function
            };
            let symbol = SymbolRecord::new(kind, name)
                .at_line(idx + 1)
                .with_params(params.clone());
            let symbol = if deep {
                symbol.with_complexity(complexity(&lines, idx))
            } else {
                symbol
            };
            push_described(&mut partial, symbol, &params, &lines, idx, deep);
            blocks.push(Block {
                indent,
                is_class: false,
            });
        } else if let Some(caps) = ROUTE_DECORATOR.captures(line) {
            decorator_routes(&mut partial, &caps, &lines, idx);
        } else if let Some(caps) = DJANGO_PATH.captures(line) {
            let route_path = format!("/{}", caps[1].trim_start_matches('^').trim_start_matches('/'));
            let mut route = RouteRecord::new("ALL", &route_path, &caps[2], idx + 1);
            route.description = describe::preceding_comment(&lines, idx);
            push_route(&mut partial, route);
        }

        idx += 1;
    }

    partial
}

struct Block {
    indent: usize,
    is_class: bool,
}

fn push_described(
    partial: &mut PartialFileRecord,
    mut symbol: SymbolRecord,
    params: &[String],
    lines: &[&str],
    idx: usize,
    deep: bool,
) {
    if deep && symbol.kind.is_describable() {
        let ctx = SymbolContext {
            name: &symbol.name,
            kind: symbol.kind,
            params,
            lines,
            line_index: idx,
            style: BlockStyle::Indent,
        };
        symbol.description = Some(describe::describe(&ctx));
    }
    partial.symbols.push(symbol);
}

fn push_route(partial: &mut PartialFileRecord, route: RouteRecord) {
    partial.symbols.push(
        SymbolRecord::new(SymbolKind::Route, &route.path)
            .with_detail(route.method.clone())
            .at_line(route.line)
            .with_description(route.description.clone()),
    );
    partial.routes.push(route);
}

/// One route per declared method for a Flask/FastAPI decorator.
fn decorator_routes(
    partial: &mut PartialFileRecord,
    caps: &regex::Captures,
    lines: &[&str],
    idx: usize,
) {
    let verb = &caps[2];
    let route_path = &caps[3];
    let rest = &caps[4];

    let methods: Vec<String> = match verb {
        "route" | "api_route" => METHODS_ARG
            .captures(rest)
            .map(|m| {
                QUOTED
                    .captures_iter(&m[1])
                    .map(|q| q[1].to_ascii_uppercase())
                    .collect::<Vec<String>>()
            })
            .filter(|methods: &Vec<String>| !methods.is_empty())
            .unwrap_or_else(|| vec!["GET".to_string()]),
        other => vec![other.to_ascii_uppercase()],
    };

    let handler = lines
        .iter()
        .enumerate()
        .skip(idx + 1)
        .take(HANDLER_LOOKAHEAD)
        .find_map(|(_, line)| DEF.captures(line).map(|c| c[2].to_string()))
        .unwrap_or_else(|| "anonymous".to_string());
    let description = describe::preceding_comment(lines, idx);

    for method in methods {
        let mut route = RouteRecord::new(method, route_path, &handler, idx + 1);
        route.description = description.clone();
        push_route(partial, route);
    }
}

fn is_model_base(bases: &str) -> bool {
    bases
        .split(',')
        .map(str::trim)
        .any(|base| MODEL_BASES.contains(&base))
}

/// Fields of a Django or SQLAlchemy model class starting at `idx`.
fn model_schema(partial: &mut PartialFileRecord, name: &str, lines: &[&str], idx: usize) {
    let base_indent = text::indent_of(lines[idx]);
    let mut fields = Vec::new();
    let mut relations = Vec::new();

    for line in lines.iter().skip(idx + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if text::indent_of(line) <= base_indent {
            break;
        }

        if let Some(caps) = DJANGO_FIELD.captures(line) {
            let field = &caps[1];
            let class = &caps[2];
            let args = &caps[3];
            if DJANGO_RELATIONS.contains(&class) {
                if let Some(target) = MODEL_ARG.captures(args) {
                    relations.push(SchemaRelation {
                        field: field.to_string(),
                        target: target[1].to_string(),
                    });
                }
            }
            fields.push(SchemaField::new(field, class, args.contains("null=True")));
        } else if let Some(caps) = SQLALCHEMY_FIELD.captures(line) {
            let field = &caps[1];
            let args = &caps[4];
            if &caps[3] == "relationship" {
                if let Some(target) = MODEL_ARG.captures(args) {
                    relations.push(SchemaRelation {
                        field: field.to_string(),
                        target: target[1].to_string(),
                    });
                }
                continue;
            }
            if let Some(fk) = FOREIGN_KEY.captures(args) {
                relations.push(SchemaRelation {
                    field: field.to_string(),
                    target: fk[1].to_string(),
                });
            }
            let ty = match caps.get(2) {
                Some(mapped) => mapped.as_str().trim().to_string(),
                None => args
                    .split(|c: char| c == ',' || c == '(' || c == ')')
                    .next()
                    .unwrap_or("")
                    .trim()
                    .trim_start_matches("db.")
                    .trim_start_matches("sa.")
                    .to_string(),
            };
            let nullable = args.contains("nullable=True")
                || caps.get(2).is_some_and(|m| m.as_str().starts_with("Optional"));
            fields.push(SchemaField::new(field, ty, nullable));
        }
    }

    partial.schemas.push(SchemaRecord {
        name: name.to_string(),
        kind: SchemaKind::Model,
        fields,
        relations,
        line: idx + 1,
    });
}

/// Index of the line holding the `)` that closes an import list.
fn join_until_close(lines: &[&str], start: usize) -> usize {
    let end = lines.len().min(start + IMPORT_SPAN);
    (start..end)
        .find(|&i| lines[i].contains(')'))
        .unwrap_or(start)
}

fn import_line(partial: &mut PartialFileRecord, line: &str, idx: usize) {
    let line = line.split('#').next().unwrap_or(line).trim();
    if let Some(caps) = FROM_IMPORT.captures(line) {
        let module = &caps[1];
        let items = caps[2]
            .trim_matches(|c| c == '(' || c == ')' || c == ' ')
            .split(',')
            .map(|item| item.split(" as ").next().unwrap_or(item).trim().to_string())
            .filter(|item| !item.is_empty() && item != ")")
            .collect();
        partial.imports.push(ImportRecord {
            module: module.to_string(),
            items,
            is_default: false,
            line: idx + 1,
        });
        if !module.starts_with('.') {
            partial.add_reference(top_level(module));
        }
    } else if let Some(caps) = IMPORT.captures(line) {
        for module in caps[1].split(',') {
            let module = module.split(" as ").next().unwrap_or(module).trim();
            if module.is_empty() {
                continue;
            }
            partial.imports.push(ImportRecord {
                module: module.to_string(),
                items: Vec::new(),
                is_default: true,
                line: idx + 1,
            });
            partial.add_reference(top_level(module));
        }
    }
}

fn dunder_all(partial: &mut PartialFileRecord, line: &str, idx: usize) {
    let Some(caps) = DUNDER_ALL.captures(line) else {
        return;
    };
    for name in QUOTED.captures_iter(&caps[1]) {
        partial.exports.push(ExportRecord {
            name: name[1].to_string(),
            kind: "__all__".to_string(),
            is_default: false,
            line: idx + 1,
        });
    }
}

fn top_level(module: &str) -> &str {
    module.split('.').next().unwrap_or(module)
}

/// 1 + decision points in the indented body under line `idx`.
fn complexity(lines: &[&str], idx: usize) -> u32 {
    let base = text::indent_of(lines[idx]);
    let mut decisions = DECISION.find_iter(lines[idx]).count();
    for line in lines.iter().skip(idx + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if text::indent_of(line) <= base {
            break;
        }
        let code = line.split('#').next().unwrap_or(line);
        decisions += DECISION.find_iter(code).count();
    }
    1 + decisions as u32
}

/// First line of a module docstring, if the file opens with one.
fn module_docstring(content: &str) -> Option<String> {
    let first = content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))?;
    let quote = ["\"\"\"", "'''"].into_iter().find(|q| first.starts_with(q))?;
    let inner = first[quote.len()..].trim_end_matches(quote).trim();
    if !inner.is_empty() {
        return Some(text::truncate_chars(inner, 80));
    }
    // docstring text starts on the following line
    content
        .lines()
        .map(str::trim)
        .skip_while(|l| !l.starts_with(quote))
        .nth(1)
        .filter(|l| !l.is_empty() && !l.starts_with(quote))
        .map(|l| text::truncate_chars(l, 80))
}
