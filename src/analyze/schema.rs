//! Schema-definition languages: Prisma and GraphQL SDL.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{language_tag, text, AnalyzeError, Analyzer};
use crate::model::{
    PartialFileRecord, SchemaField, SchemaKind, SchemaRecord, SchemaRelation, SymbolKind,
    SymbolRecord,
};

mod schema_patterns {
    use super::*;

    /// `model User {`, `enum Role {`
    pub static PRISMA_BLOCK: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(model|enum|view|type)\s+(\w+)\s*\{").expect("Invalid Prisma block regex")
    });

    /// `email String? @unique`
    pub static PRISMA_FIELD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(\w+)\s+(\w+)(\[\])?(\?)?(.*)$").expect("Invalid Prisma field regex")
    });

    pub static PRISMA_PROVIDER: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"(?m)^\s*provider\s*=\s*"([\w-]+)""#).expect("Invalid provider regex")
    });

    /// `type Query {`, `input NewUser {`, `interface Node {`
    pub static GRAPHQL_BLOCK: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(?:extend\s+)?(type|input|interface)\s+(\w+)(?:\s+implements\s+[^{]+)?\s*\{")
            .expect("Invalid GraphQL block regex")
    });

    pub static GRAPHQL_ENUM: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(enum|scalar|union)\s+(\w+)").expect("Invalid GraphQL enum regex")
    });

    /// `posts(first: Int): [Post!]!`
    pub static GRAPHQL_FIELD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(\w+)\s*(?:\([^)]*\))?\s*:\s*([\[\]\w!]+)")
            .expect("Invalid GraphQL field regex")
    });
}

use schema_patterns::*;

/// Root operation types whose fields are entry points, not data.
const GRAPHQL_ROOTS: &[&str] = &["Query", "Mutation", "Subscription"];

pub struct SchemaAnalyzer;

impl Analyzer for SchemaAnalyzer {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn extract(&self, content: &str, path: &str) -> Result<PartialFileRecord, AnalyzeError> {
        let lines: Vec<&str> = content.lines().collect();
        let mut partial = PartialFileRecord::default();

        if language_tag(path) == "prisma" {
            partial.add_detector("prisma");
            for caps in PRISMA_PROVIDER.captures_iter(content) {
                if !caps[1].starts_with("prisma-client") {
                    partial.add_detector(caps[1].to_string());
                }
            }
            prisma(&lines, &mut partial);
        } else {
            partial.add_detector("graphql");
            graphql(&lines, &mut partial);
        }
        Ok(partial)
    }

    fn summarize(&self, partial: &PartialFileRecord, content: &str, _path: &str) -> String {
        if partial.has_detector("prisma") {
            return format!(
                "Prisma schema with {}",
                text::plural(partial.schemas.len(), "model")
            );
        }
        if !partial.schemas.is_empty() {
            return format!(
                "GraphQL schema with {}",
                text::plural(partial.schemas.len(), "type")
            );
        }
        text::first_content_line(content, &["#"]).unwrap_or_else(|| "Empty schema".to_string())
    }
}

fn prisma(lines: &[&str], partial: &mut PartialFileRecord) {
    let models: Vec<&str> = lines
        .iter()
        .filter_map(|line| PRISMA_BLOCK.captures(line.trim()))
        .filter(|caps| &caps[1] != "enum")
        .filter_map(|caps| caps.get(2).map(|m| m.as_str()))
        .collect();

    for (idx, line) in lines.iter().enumerate() {
        let Some(caps) = PRISMA_BLOCK.captures(line.trim()) else {
            continue;
        };
        let keyword = &caps[1];
        let name = &caps[2];
        let body = text::find_block(lines, idx, '{', '}')
            .map(|(body, _)| body)
            .unwrap_or_default();

        if keyword == "enum" {
            let values = body
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with("//") && !l.starts_with('@'))
                .count();
            partial.symbols.push(
                SymbolRecord::new(SymbolKind::Type, name)
                    .with_detail(format!("enum, {}", text::plural(values, "value")))
                    .at_line(idx + 1),
            );
            continue;
        }

        let mut fields = Vec::new();
        let mut relations = Vec::new();
        for member in body.lines().map(str::trim) {
            if member.is_empty() || member.starts_with("//") || member.starts_with("@@") {
                continue;
            }
            let Some(field) = PRISMA_FIELD.captures(member) else {
                continue;
            };
            let ty = &field[2];
            let list = field.get(3).is_some();
            let attributes = &field[5];
            if attributes.contains("@relation") || models.contains(&ty) {
                relations.push(SchemaRelation {
                    field: field[1].to_string(),
                    target: ty.to_string(),
                });
            }
            let ty = if list { format!("{}[]", ty) } else { ty.to_string() };
            fields.push(SchemaField::new(&field[1], ty, field.get(4).is_some()));
        }

        partial.symbols.push(
            SymbolRecord::new(SymbolKind::Entity, name)
                .with_detail(keyword)
                .at_line(idx + 1),
        );
        partial.schemas.push(SchemaRecord {
            name: name.to_string(),
            kind: SchemaKind::Model,
            fields,
            relations,
            line: idx + 1,
        });
    }
}

fn graphql(lines: &[&str], partial: &mut PartialFileRecord) {
    let declared: Vec<&str> = lines
        .iter()
        .filter_map(|line| GRAPHQL_BLOCK.captures(line.trim()))
        .filter_map(|caps| caps.get(2).map(|m| m.as_str()))
        .collect();

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if let Some(caps) = GRAPHQL_ENUM.captures(trimmed) {
            partial.symbols.push(
                SymbolRecord::new(SymbolKind::Type, &caps[2])
                    .with_detail(&caps[1])
                    .at_line(idx + 1),
            );
            continue;
        }
        let Some(caps) = GRAPHQL_BLOCK.captures(trimmed) else {
            continue;
        };
        let keyword = &caps[1];
        let name = &caps[2];
        let body = text::find_block(lines, idx, '{', '}')
            .map(|(body, _)| body)
            .unwrap_or_default();

        let mut fields = Vec::new();
        let mut relations = Vec::new();
        for member in body.lines().map(str::trim) {
            let Some(field) = GRAPHQL_FIELD.captures(member) else {
                continue;
            };
            let raw = &field[2];
            let nullable = !raw.ends_with('!');
            let ty = raw.strip_suffix('!').unwrap_or(raw);
            let base = ty.trim_matches(|c| c == '[' || c == ']' || c == '!');
            if declared.contains(&base) && !GRAPHQL_ROOTS.contains(&name) {
                relations.push(SchemaRelation {
                    field: field[1].to_string(),
                    target: base.to_string(),
                });
            }
            if GRAPHQL_ROOTS.contains(&name) {
                partial.symbols.push(
                    SymbolRecord::new(SymbolKind::Function, &field[1])
                        .with_detail(name.to_ascii_lowercase())
                        .at_line(idx + 1),
                );
            }
            fields.push(SchemaField::new(&field[1], ty, nullable));
        }

        partial.symbols.push(
            SymbolRecord::new(SymbolKind::Type, name)
                .with_detail(keyword)
                .at_line(idx + 1),
        );
        partial.schemas.push(SchemaRecord {
            name: name.to_string(),
            kind: match keyword {
                "interface" => SchemaKind::Interface,
                _ => SchemaKind::Type,
            },
            fields,
            relations,
            line: idx + 1,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRISMA: &str = r#"datasource db {
  provider = "postgresql"
  url      = env("DATABASE_URL")
}

generator client {
  provider = "prisma-client-js"
}

model User {
  id    Int     @id @default(autoincrement())
  email String  @unique
  name  String?
  posts Post[]
  role  Role    @default(USER)
  // audit
  @@map("users")
}

model Post {
  id       Int  @id
  author   User @relation(fields: [authorId], references: [id])
  authorId Int
}

enum Role {
  USER
  ADMIN
}
"#;

    #[test]
    fn test_prisma_models() {
        let partial = SchemaAnalyzer.extract(PRISMA, "prisma/schema.prisma").unwrap();
        assert_eq!(partial.detectors, vec!["prisma", "postgresql"]);
        assert_eq!(partial.schemas.len(), 2);

        let user = &partial.schemas[0];
        assert_eq!(user.name, "User");
        assert_eq!(
            user.fields,
            vec![
                SchemaField::new("id", "Int", false),
                SchemaField::new("email", "String", false),
                SchemaField::new("name", "String", true),
                SchemaField::new("posts", "Post[]", false),
                SchemaField::new("role", "Role", false),
            ]
        );
        assert_eq!(
            user.relations,
            vec![SchemaRelation {
                field: "posts".to_string(),
                target: "Post".to_string()
            }]
        );
        assert_eq!(partial.schemas[1].relations[0].target, "User");

        let role = partial.symbols.iter().find(|s| s.name == "Role").unwrap();
        assert_eq!(role.kind, SymbolKind::Type);
        assert_eq!(role.detail.as_deref(), Some("enum, 2 values"));

        assert_eq!(
            SchemaAnalyzer.summarize(&partial, PRISMA, "schema.prisma"),
            "Prisma schema with 2 models"
        );
    }

    #[test]
    fn test_graphql_types() {
        let src = "type User {\n  id: ID!\n  name: String\n  posts(first: Int): [Post!]!\n}\n\ntype Post { id: ID! }\n\ntype Query {\n  me: User\n}\n\nenum Color { RED }\n";
        let partial = SchemaAnalyzer.extract(src, "api/schema.graphql").unwrap();
        assert_eq!(partial.detectors, vec!["graphql"]);

        let user = &partial.schemas[0];
        assert_eq!(
            user.fields,
            vec![
                SchemaField::new("id", "ID", false),
                SchemaField::new("name", "String", true),
                SchemaField::new("posts", "[Post!]", false),
            ]
        );
        assert_eq!(user.relations[0].target, "Post");

        // single-line block
        assert_eq!(partial.schemas[1].fields, vec![SchemaField::new("id", "ID", false)]);

        let query = &partial.schemas[2];
        assert!(query.relations.is_empty());
        assert!(partial
            .symbols
            .iter()
            .any(|s| s.name == "me" && s.detail.as_deref() == Some("query")));
        assert_eq!(
            SchemaAnalyzer.summarize(&partial, src, "schema.graphql"),
            "GraphQL schema with 3 types"
        );
    }
}
