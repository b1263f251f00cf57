//! Java and C# analyzer.
//!
//! Both languages put annotations (`@GetMapping`, `[HttpGet]`) on the lines
//! above a declaration, so the scan keeps the annotations seen since the
//! last line of code and hands them to whatever declaration follows.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{default_summary, language_tag, text, AnalyzeError, Analyzer};
use crate::describe::{self, BlockStyle, SymbolContext};
use crate::model::{
    ExportRecord, ImportRecord, PartialFileRecord, RouteRecord, SchemaField, SchemaKind,
    SchemaRecord, SchemaRelation, SymbolKind, SymbolRecord,
};

const COMPLEXITY_SPAN: usize = 300;

mod jvm_patterns {
    use super::*;

    pub static DETECTORS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
        [
            (
                "spring",
                r"org\.springframework|@(?:RestController|Controller|Service|Repository|SpringBootApplication|Autowired)\b|@(?:Get|Post|Put|Delete|Patch|Request)Mapping\b",
            ),
            (
                "aspnet",
                r"using\s+Microsoft\.AspNetCore|\[ApiController\]|\[Http(?:Get|Post|Put|Delete|Patch)\b|:\s*(?:Controller|ControllerBase)\b",
            ),
            ("jpa", r"javax\.persistence|jakarta\.persistence|@Entity\b"),
            ("lombok", r"import\s+lombok\.|@(?:Data|Getter|Setter|Builder|NoArgsConstructor|AllArgsConstructor)\b"),
            ("entity-framework", r"Microsoft\.EntityFrameworkCore|\bDbContext\b|\bDbSet<"),
            ("junit", r"org\.junit|@Test\b"),
        ]
        .into_iter()
        .map(|(tag, pattern)| (tag, Regex::new(pattern).expect("Invalid JVM detector regex")))
        .collect()
    });

    /// `public abstract class Foo extends Bar implements Baz {`
    pub static TYPE_DECL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^(?:(?:public|private|protected|internal|static|abstract|final|sealed|partial|readonly)\s+)*(class|interface|enum|record|struct)\s+(\w+)(.*)$",
        )
        .expect("Invalid type declaration regex")
    });

    /// Base type after `extends` (Java) or `:` (C#)
    pub static BASE_TYPE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?:\bextends\s+|^\s*(?:<[^>]*>)?\s*(?:\([^)]*\))?\s*:\s*)([\w.]+)")
            .expect("Invalid base type regex")
    });

    /// Modifier-prefixed method: `public ResponseEntity<User> get(@PathVariable Long id)`
    pub static METHOD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^(?:(?:public|private|protected|internal|static|final|abstract|synchronized|async|override|virtual|sealed|native|default)\s+)+(?:<[^>]+>\s+)?([\w.\[\]?]+(?:<[^()]*>)?(?:\[\])?)\s+(\w+)\s*\(([^)]*)\)?",
        )
        .expect("Invalid method regex")
    });

    /// Field declaration: `private String email;`
    pub static FIELD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^(?:(?:private|protected|public|internal|final|transient|readonly|required)\s+)+([\w.?]+(?:<[^;=]*>)?(?:\[\])?)\s+(\w+)\s*(?:=[^;]*)?;",
        )
        .expect("Invalid field regex")
    });

    /// C# auto-property: `public string Email { get; set; }`
    pub static PROPERTY: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^public\s+(?:virtual\s+|required\s+)*([\w.?]+(?:<[^{]*>)?)\s+(\w+)\s*\{\s*get;")
            .expect("Invalid property regex")
    });

    /// `@GetMapping("/x")`, `@RequestMapping(value = "/x", method = RequestMethod.POST)`
    pub static SPRING_MAPPING: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^@(Get|Post|Put|Delete|Patch|Request)Mapping\b\s*(?:\((.*)\))?")
            .expect("Invalid Spring mapping regex")
    });

    pub static REQUEST_METHOD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"RequestMethod\.(\w+)").expect("Invalid RequestMethod regex")
    });

    pub static FIRST_STRING: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#""([^"]*)""#).expect("Invalid string literal regex"));

    /// `[HttpGet]`, `[HttpPost("{id}")]`
    pub static HTTP_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"^\[Http(Get|Post|Put|Delete|Patch)(?:\(\s*"([^"]*)"\s*\))?\]"#)
            .expect("Invalid HTTP attribute regex")
    });

    /// `[Route("api/[controller]")]`
    pub static ROUTE_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"^\[Route\(\s*"([^"]*)"\s*\)\]"#).expect("Invalid Route attribute regex")
    });

    pub static RELATION_ANNOTATION: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^@(?:ManyToOne|OneToMany|OneToOne|ManyToMany)\b")
            .expect("Invalid relation annotation regex")
    });

    pub static JAVA_IMPORT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^import\s+(?:static\s+)?([\w.]+?)(?:\.\*)?\s*;").expect("Invalid import regex")
    });

    pub static CSHARP_USING: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^using\s+(?:static\s+)?([\w.]+)\s*;").expect("Invalid using regex")
    });

    pub static DECISION: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\b(?:if|for|foreach|while|case|catch)\b|&&|\|\||\?\?")
            .expect("Invalid decision regex")
    });

    /// Generic argument of a collection type: `List<Order>` → `Order`
    pub static GENERIC_ARG: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"<\s*(\w+)\s*>").expect("Invalid generic argument regex"));
}

use jvm_patterns::*;

/// Method names that are statements, not declarations.
const NOT_METHODS: &[&str] = &["if", "for", "while", "switch", "catch", "return", "new"];

/// Field types that can never hold null.
const PRIMITIVES: &[&str] = &[
    "int", "long", "short", "byte", "char", "boolean", "double", "float", "bool", "decimal",
    "Guid", "DateTime",
];

pub struct JvmAnalyzer;

impl Analyzer for JvmAnalyzer {
    fn name(&self) -> &'static str {
        "jvm"
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
            let framework = if partial.has_detector("aspnet") {
                "ASP.NET controller"
            } else if partial.has_detector("spring") {
                "Spring REST controller"
            } else {
                "Controller"
            };
            return format!(
                "{} with {}",
                framework,
                text::plural(partial.routes.len(), "route")
            );
        }
        if let Some(schema) = partial.schemas.first() {
            return format!(
                "JPA entity {} with {}",
                schema.name,
                text::plural(schema.fields.len(), "field")
            );
        }
        if partial.has_detector("junit") {
            return "Test suite".to_string();
        }
        default_summary(
            partial,
            content,
            path,
            &["//", "/*", "*", "package ", "import ", "using ", "namespace "],
        )
    }
}

/// A type whose body is open.
struct TypeScope {
    body_depth: i32,
    /// URL prefix from a class-level mapping
    route_prefix: String,
    /// Index into `partial.schemas` for `@Entity` classes
    schema: Option<usize>,
}

fn extract_with(content: &str, path: &str, deep: bool) -> PartialFileRecord {
    let lines: Vec<&str> = content.lines().collect();
    let mut partial = PartialFileRecord::default();

    partial.add_detector(if language_tag(path) == "cs" {
        "csharp"
    } else {
        "java"
    });
    for (tag, pattern) in DETECTORS.iter() {
        if pattern.is_match(content) {
            partial.add_detector(*tag);
        }
    }

    let mut scanner = Scanner {
        lines: &lines,
        deep,
        partial,
        annotations: Vec::new(),
        types: Vec::new(),
        pending_type: None,
    };
    scanner.scan();
    scanner.partial
}

struct Scanner<'a> {
    lines: &'a [&'a str],
    /// Run the description cascade and complexity count
    deep: bool,
    partial: PartialFileRecord,
    /// Indices of annotation lines since the last line of code
    annotations: Vec<usize>,
    types: Vec<TypeScope>,
    /// Declared type whose opening brace has not been seen yet
    pending_type: Option<TypeScope>,
}

impl<'a> Scanner<'a> {
    fn scan(&mut self) {
        let lines = self.lines;
        let mut depth = 0i32;
        let mut in_block_comment = false;

        for (idx, raw) in lines.iter().enumerate() {
            let line = raw.trim();
            if in_block_comment {
                in_block_comment = !line.contains("*/");
                continue;
            }
            if line.starts_with("/*") {
                in_block_comment = !line.contains("*/");
                continue;
            }
            if line.is_empty() || line.starts_with("//") || line.starts_with('*') {
                continue;
            }

            if line.starts_with('@') || (line.starts_with('[') && line.ends_with(']')) {
                self.annotations.push(idx);
                depth += text::brace_delta(raw);
                continue;
            }

            if let Some(mut scope) = self.pending_type.take() {
                if line.contains('{') {
                    scope.body_depth = depth + 1;
                    self.types.push(scope);
                } else {
                    self.pending_type = Some(scope);
                }
            }
            let in_type_body = self.types.last().map(|t| t.body_depth) == Some(depth);

            if depth == 0 {
                self.import_line(line, idx);
            }

            if let Some(caps) = TYPE_DECL.captures(line) {
                self.type_declaration(&caps[1], &caps[2], &caps[3], line, idx, depth);
            } else if in_type_body {
                if let Some(caps) = METHOD.captures(line) {
                    if !NOT_METHODS.contains(&&caps[2]) && !line.ends_with(';') {
                        self.method(&caps[2], &caps[3], idx);
                    }
                } else {
                    self.field(line);
                }
            }

            self.annotations.clear();
            depth += text::brace_delta(raw);
            while self.types.last().is_some_and(|t| depth < t.body_depth) {
                self.types.pop();
            }
        }
    }

    fn annotation_lines(&self) -> Vec<&'a str> {
        self.annotations
            .iter()
            .map(|&i| self.lines[i].trim())
            .collect()
    }

    fn type_declaration(
        &mut self,
        keyword: &str,
        name: &str,
        rest: &str,
        line: &str,
        idx: usize,
        depth: i32,
    ) {
        let base = BASE_TYPE
            .captures(rest)
            .map(|caps| caps[1].to_string());
        let detail = match keyword {
            "class" => base,
            other => Some(other.to_string()),
        };

        let mut symbol = SymbolRecord::new(SymbolKind::Class, name).at_line(idx + 1);
        if let Some(detail) = detail {
            symbol = symbol.with_detail(detail);
        }
        let ctx = SymbolContext {
            name,
            kind: SymbolKind::Class,
            params: &[],
            lines: self.lines,
            line_index: idx,
            style: BlockStyle::Braces,
        };
        if self.deep {
            symbol.description = Some(describe::describe(&ctx));
        }
        self.partial.symbols.push(symbol);

        if line.starts_with("public") {
            self.partial.exports.push(ExportRecord {
                name: name.to_string(),
                kind: keyword.to_string(),
                is_default: false,
                line: idx + 1,
            });
        }

        let annotations = self.annotation_lines();
        let mut route_prefix = String::new();
        let mut is_entity = false;
        for annotation in &annotations {
            if let Some(caps) = SPRING_MAPPING.captures(annotation) {
                if let Some(path) = caps.get(2).and_then(|args| FIRST_STRING.captures(args.as_str())) {
                    route_prefix = path[1].to_string();
                }
            } else if let Some(caps) = ROUTE_ATTRIBUTE.captures(annotation) {
                let controller = name
                    .strip_suffix("Controller")
                    .unwrap_or(name)
                    .to_ascii_lowercase();
                route_prefix = caps[1].replace("[controller]", &controller);
            } else if annotation.starts_with("@Entity") {
                is_entity = true;
            }
        }

        let schema = is_entity.then(|| {
            self.partial.symbols.push(
                SymbolRecord::new(SymbolKind::Entity, name)
                    .with_detail("jpa")
                    .at_line(idx + 1),
            );
            self.partial.schemas.push(SchemaRecord {
                name: name.to_string(),
                kind: SchemaKind::Model,
                fields: Vec::new(),
                relations: Vec::new(),
                line: idx + 1,
            });
            self.partial.schemas.len() - 1
        });

        let scope = TypeScope {
            body_depth: depth + 1,
            route_prefix,
            schema,
        };
        if line.contains('{') {
            self.types.push(scope);
        } else {
            self.pending_type = Some(scope);
        }
    }

    fn method(&mut self, name: &str, raw_params: &str, idx: usize) {
        let params: Vec<String> = text::parse_params(raw_params)
            .into_iter()
            .map(|p| p.trim_start_matches('@').to_string())
            .collect();
        let mut symbol = SymbolRecord::new(SymbolKind::Method, name)
            .at_line(idx + 1)
            .with_params(params.clone());
        if self.deep {
            let ctx = SymbolContext {
                name,
                kind: SymbolKind::Method,
                params: &params,
                lines: self.lines,
                line_index: idx,
                style: BlockStyle::Braces,
            };
            symbol = symbol.with_complexity(complexity(self.lines, idx));
            symbol.description = Some(describe::describe(&ctx));
        }
        self.partial.symbols.push(symbol);

        let prefix = self
            .types
            .last()
            .map(|t| t.route_prefix.clone())
            .unwrap_or_default();
        let mut routes = Vec::new();
        for annotation in self.annotation_lines() {
            if let Some(caps) = SPRING_MAPPING.captures(annotation) {
                let args = caps.get(2).map_or("", |m| m.as_str());
                let method = match &caps[1] {
                    "Request" => REQUEST_METHOD
                        .captures(args)
                        .map(|m| m[1].to_string())
                        .unwrap_or_default(),
                    verb => verb.to_string(),
                };
                let path = FIRST_STRING
                    .captures(args)
                    .map(|m| m[1].to_string())
                    .unwrap_or_default();
                routes.push((method, join_route(&prefix, &path)));
            } else if let Some(caps) = HTTP_ATTRIBUTE.captures(annotation) {
                let path = caps.get(2).map_or("", |m| m.as_str());
                routes.push((caps[1].to_string(), join_route(&prefix, path)));
            }
        }

        let description = describe::preceding_comment(self.lines, idx);
        for (method, path) in routes {
            let mut route = RouteRecord::new(method, &path, name, idx + 1);
            route.description = description.clone();
            self.partial.symbols.push(
                SymbolRecord::new(SymbolKind::Route, &path)
                    .with_detail(route.method.clone())
                    .at_line(idx + 1)
                    .with_description(description.clone()),
            );
            self.partial.routes.push(route);
        }
    }

    /// Entity field or property inside an `@Entity` body.
    fn field(&mut self, line: &str) {
        let Some(schema_idx) = self.types.last().and_then(|t| t.schema) else {
            return;
        };
        let Some(caps) = FIELD.captures(line).or_else(|| PROPERTY.captures(line)) else {
            return;
        };
        if line.contains(" static ") || line.starts_with("static ") {
            return;
        }
        let ty = caps[1].to_string();
        let name = caps[2].to_string();

        let annotations = self.annotation_lines();
        if annotations.iter().any(|a| a.starts_with("@Transient")) {
            return;
        }
        let required = annotations.iter().any(|a| {
            a.starts_with("@Id")
                || a.starts_with("@NotNull")
                || a.starts_with("@NonNull")
                || a.starts_with("@NotBlank")
                || (a.starts_with("@Column") && a.replace(' ', "").contains("nullable=false"))
        });
        let nullable = !required && !PRIMITIVES.contains(&ty.as_str());
        let relation = annotations
            .iter()
            .any(|a| RELATION_ANNOTATION.is_match(a))
            .then(|| {
                GENERIC_ARG
                    .captures(&ty)
                    .map(|g| g[1].to_string())
                    .unwrap_or_else(|| ty.clone())
            });

        let schema = &mut self.partial.schemas[schema_idx];
        if let Some(target) = relation {
            schema.relations.push(SchemaRelation {
                field: name.clone(),
                target,
            });
        }
        schema.fields.push(SchemaField::new(name, ty, nullable));
    }

    fn import_line(&mut self, line: &str, idx: usize) {
        let Some(caps) = JAVA_IMPORT
            .captures(line)
            .or_else(|| CSHARP_USING.captures(line))
        else {
            return;
        };
        let module = &caps[1];
        let item = module.rsplit('.').next().unwrap_or(module);
        self.partial.imports.push(ImportRecord {
            module: module.to_string(),
            items: vec![item.to_string()],
            is_default: false,
            line: idx + 1,
        });
        let package: Vec<&str> = module.split('.').take(2).collect();
        self.partial.add_reference(package.join("."));
    }
}

/// `/api/users` + `{id}` → `/api/users/{id}`
fn join_route(prefix: &str, path: &str) -> String {
    let joined = [prefix, path]
        .iter()
        .map(|part| part.trim_matches('/'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{}", joined)
}

fn complexity(lines: &[&str], idx: usize) -> u32 {
    let end = text::block_end(lines, idx, COMPLEXITY_SPAN);
    let decisions: usize = lines[idx..=end]
        .iter()
        .map(|line| DECISION.find_iter(line).count())
        .sum();
    1 + decisions as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPRING_CONTROLLER: &str = r#"package com.shop.web;

import org.springframework.web.bind.annotation.*;
import java.util.List;

@RestController
@RequestMapping("/api/users")
public class UserController {

    /** Lists every user */
    @GetMapping
    public List<User> listUsers() {
        return repo.findAll();
    }

    @PostMapping("/{id}/roles")
    public ResponseEntity<Void> addRole(@PathVariable Long id, @RequestBody Role role) {
        if (id == null || role == null) {
            return ResponseEntity.badRequest().build();
        }
        return ResponseEntity.ok().build();
    }
}
"#;

    #[test]
    fn test_standard_pass_keeps_routes() {
        let path = "src/main/java/UserController.java";
        let deep = JvmAnalyzer.extract(SPRING_CONTROLLER, path).unwrap();
        let standard = JvmAnalyzer.extract_standard(SPRING_CONTROLLER, path).unwrap();

        assert!(!standard.routes.is_empty());
        assert_eq!(standard, deep.into_standard());
    }

    #[test]
    fn test_spring_routes_use_class_prefix() {
        let partial = JvmAnalyzer
            .extract(SPRING_CONTROLLER, "src/main/java/UserController.java")
            .unwrap();

        assert!(partial.has_detector("java"));
        assert!(partial.has_detector("spring"));
        let routes: Vec<(&str, &str, &str)> = partial
            .routes
            .iter()
            .map(|r| (r.method.as_str(), r.path.as_str(), r.handler.as_str()))
            .collect();
        assert_eq!(
            routes,
            vec![
                ("GET", "/api/users", "listUsers"),
                ("POST", "/api/users/{id}/roles", "addRole"),
            ]
        );
        assert_eq!(partial.routes[0].description.as_deref(), Some("Lists every user"));
        assert_eq!(
            partial.references,
            vec!["org.springframework", "java.util"]
        );

        let add_role = partial
            .symbols
            .iter()
            .find(|s| s.name == "addRole" && s.kind == SymbolKind::Method)
            .unwrap();
        assert_eq!(
            add_role.params.as_deref(),
            Some(&["id".to_string(), "role".to_string()][..])
        );
        assert_eq!(add_role.complexity, Some(3));
        assert_eq!(
            JvmAnalyzer.summarize(&partial, SPRING_CONTROLLER, "UserController.java"),
            "Spring REST controller with 2 routes"
        );
    }

    #[test]
    fn test_aspnet_attribute_routes() {
        let src = r#"using Microsoft.AspNetCore.Mvc;

[ApiController]
[Route("api/[controller]")]
public class OrdersController : ControllerBase
{
    [HttpGet("{id}")]
    public async Task<IActionResult> GetOrder(int id)
    {
        return Ok();
    }

    [HttpDelete]
    public IActionResult Purge()
    {
        return NoContent();
    }
}
"#;
        let partial = JvmAnalyzer.extract(src, "Controllers/OrdersController.cs").unwrap();
        assert!(partial.has_detector("csharp"));
        assert!(partial.has_detector("aspnet"));

        let routes: Vec<(&str, &str)> = partial
            .routes
            .iter()
            .map(|r| (r.method.as_str(), r.path.as_str()))
            .collect();
        assert_eq!(
            routes,
            vec![("GET", "/api/orders/{id}"), ("DELETE", "/api/orders")]
        );
        let class = &partial.symbols[0];
        assert_eq!(class.detail.as_deref(), Some("ControllerBase"));
    }

    #[test]
    fn test_jpa_entity_schema() {
        let src = r#"import jakarta.persistence.*;

@Entity
@Table(name = "orders")
public class Order {
    @Id
    private Long id;

    @Column(nullable = false)
    private String number;

    private String note;

    private int quantity;

    @ManyToOne
    private Customer customer;

    @OneToMany
    private List<LineItem> items;

    private static final long serialVersionUID = 1L;
}
"#;
        let partial = JvmAnalyzer.extract(src, "Order.java").unwrap();
        assert!(partial.has_detector("jpa"));
        let schema = &partial.schemas[0];
        assert_eq!(schema.name, "Order");
        let fields: Vec<(&str, bool)> = schema
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.nullable))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("id", false),
                ("number", false),
                ("note", true),
                ("quantity", false),
                ("customer", true),
                ("items", true),
            ]
        );
        let targets: Vec<&str> = schema.relations.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, vec!["Customer", "LineItem"]);
        assert!(partial
            .symbols
            .iter()
            .any(|s| s.kind == SymbolKind::Entity && s.name == "Order"));
    }

    #[test]
    fn test_type_kinds_and_nesting() {
        let src = "public interface Repo {\n}\npublic enum Color { RED, GREEN }\nclass Outer {\n    static class Inner extends Base {\n        private void run() {\n        }\n    }\n}\n";
        let partial = JvmAnalyzer.extract(src, "Types.java").unwrap();
        let classes: Vec<(&str, Option<&str>)> = partial
            .symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Class)
            .map(|s| (s.name.as_str(), s.detail.as_deref()))
            .collect();
        assert_eq!(
            classes,
            vec![
                ("Repo", Some("interface")),
                ("Color", Some("enum")),
                ("Outer", None),
                ("Inner", Some("Base")),
            ]
        );
        assert!(partial
            .symbols
            .iter()
            .any(|s| s.kind == SymbolKind::Method && s.name == "run"));
        assert_eq!(partial.exports.len(), 2);
    }

    #[test]
    fn test_join_route() {
        assert_eq!(join_route("/api/users/", "/{id}"), "/api/users/{id}");
        assert_eq!(join_route("", ""), "/");
        assert_eq!(join_route("api", ""), "/api");
    }
}
