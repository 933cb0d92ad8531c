//! File-level name context: namespaces, `use` imports, declared class-likes and
//! qualified-name reconstruction.

use std::collections::HashSet;

use super::tokens::{TokenKind, TokenStream};

const DECLARATION_SCOPES: &[&str] = &["class", "interface", "trait", "enum", "function"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Class,
    Function,
    Const,
}

/// One clause of a `use` statement.
#[derive(Debug, Clone)]
pub struct UseImport {
    pub kind: ImportKind,
    pub full_name: String,
    pub alias: String,
    pub explicit_alias: bool,
    pub use_token: usize,
    /// First and last name token of the imported path.
    pub name_first: usize,
    pub name_last: usize,
    pub as_token: Option<usize>,
    pub alias_token: Option<usize>,
    pub statement_end: usize,
    pub clause_count: usize,
    pub grouped: bool,
}

impl UseImport {
    /// Last segment of the imported path.
    pub fn short_name(&self) -> &str {
        self.full_name
            .rsplit('\\')
            .next()
            .unwrap_or(self.full_name.as_str())
    }
}

/// Names declared and imported by one file.
#[derive(Debug, Clone, Default)]
pub struct FileContext {
    namespaces: Vec<(usize, String)>,
    imports: Vec<UseImport>,
    declared_types: HashSet<String>,
}

impl FileContext {
    pub fn from_tokens(tokens: &TokenStream) -> Self {
        let mut context = Self::default();

        for (idx, token) in tokens.iter() {
            if token.is_keyword("namespace") {
                if let Some(name) = namespace_name(tokens, idx) {
                    context.namespaces.push((idx, name));
                }
            } else if token.is_keyword("use") {
                if tokens.enclosing_owner(idx, DECLARATION_SCOPES).is_some() {
                    continue;
                }
                let closure_use = tokens
                    .next_code(idx)
                    .is_some_and(|next| tokens[next].is_punct("("));
                if !closure_use {
                    context.imports.extend(parse_use_statement(tokens, idx));
                }
            } else if token.is_any_keyword(&["class", "interface", "trait", "enum"]) {
                let after_scope_resolution = tokens
                    .prev_code(idx)
                    .is_some_and(|prev| tokens[prev].is_punct("::"));
                if after_scope_resolution {
                    continue;
                }
                if let Some(name) = tokens.next_code(idx).filter(|&n| tokens[n].is_name()) {
                    context
                        .declared_types
                        .insert(tokens[name].text.to_ascii_lowercase());
                }
            }
        }

        context
    }

    /// Namespace in effect at token `idx`.
    pub fn namespace_at(&self, idx: usize) -> Option<&str> {
        self.namespaces
            .iter()
            .take_while(|(start, _)| *start < idx)
            .last()
            .map(|(_, name)| name.as_str())
            .filter(|name| !name.is_empty())
    }

    pub fn imports(&self) -> &[UseImport] {
        &self.imports
    }

    /// Class import registered under `alias`. The first registration wins.
    pub fn class_import(&self, alias: &str) -> Option<&UseImport> {
        self.imports
            .iter()
            .find(|import| import.kind == ImportKind::Class && import.alias.eq_ignore_ascii_case(alias))
    }

    pub fn declares_type(&self, short_name: &str) -> bool {
        self.declared_types
            .contains(&short_name.to_ascii_lowercase())
    }

    /// Names a type written at `idx` may refer to, most specific first.
    pub fn resolution_candidates(&self, name: &QualifiedName, idx: usize) -> Vec<String> {
        let written = normalize_type_name(&name.joined());
        let mut candidates = vec![written.clone()];

        if !name.fully_qualified {
            let first = &name.segments[0];
            if let Some(import) = self.class_import(first) {
                let mut resolved = import.full_name.clone();
                for segment in &name.segments[1..] {
                    resolved.push('\\');
                    resolved.push_str(segment);
                }
                candidates.push(normalize_type_name(&resolved));
            } else if let Some(namespace) = self.namespace_at(idx) {
                candidates.push(normalize_type_name(&format!("{namespace}\\{written}")));
            }
            candidates.push(name.short_name().to_string());
        }

        let mut seen = HashSet::new();
        candidates.retain(|candidate| seen.insert(candidate.to_ascii_lowercase()));
        candidates
    }
}

/// A name reconstructed from adjacent name and `\` tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub segments: Vec<String>,
    pub fully_qualified: bool,
    pub first: usize,
    pub last: usize,
}

impl QualifiedName {
    pub fn joined(&self) -> String {
        self.segments.join("\\")
    }

    pub fn short_name(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }
}

/// Reconstructs the qualified name that the name token at `idx` belongs to.
pub fn qualified_name_at(tokens: &TokenStream, idx: usize) -> Option<QualifiedName> {
    if !tokens.get(idx)?.is_name() {
        return None;
    }

    let mut first = idx;
    let mut fully_qualified = false;
    while first >= 1 && tokens[first - 1].is_ns_separator() {
        let separator = first - 1;
        match separator.checked_sub(1) {
            Some(prev) if tokens[prev].is_name() => first = prev,
            _ => {
                fully_qualified = !separator
                    .checked_sub(1)
                    .is_some_and(|prev| tokens[prev].is_keyword("namespace"));
                first = separator;
                break;
            }
        }
    }

    let mut last = idx;
    while last + 2 < tokens.len() && tokens[last + 1].is_ns_separator() && tokens[last + 2].is_name() {
        last += 2;
    }

    let segments = (first..=last)
        .filter(|&i| tokens[i].is_name())
        .map(|i| tokens[i].text.clone())
        .collect();

    Some(QualifiedName {
        segments,
        fully_qualified,
        first,
        last,
    })
}

/// Collapses runs of backslashes and drops the leading one.
pub fn normalize_type_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch == '\\' && (normalized.is_empty() || normalized.ends_with('\\')) {
            continue;
        }
        normalized.push(ch);
    }
    normalized.trim_end_matches('\\').to_string()
}

fn namespace_name(tokens: &TokenStream, keyword: usize) -> Option<String> {
    let next = tokens.next_code(keyword)?;
    if tokens[next].is_ns_separator() {
        // `namespace\foo()` is a relative name, not a declaration
        return None;
    }
    let mut name = String::new();
    let mut cursor = next;
    while tokens[cursor].is_name() || tokens[cursor].is_ns_separator() {
        name.push_str(&tokens[cursor].text);
        cursor = tokens.next_code(cursor)?;
    }
    Some(normalize_type_name(&name))
}

struct PendingClause {
    kind: ImportKind,
    name: String,
    first: Option<usize>,
    last: usize,
    as_token: Option<usize>,
    alias_token: Option<usize>,
}

impl PendingClause {
    fn new(kind: ImportKind) -> Self {
        Self {
            kind,
            name: String::new(),
            first: None,
            last: 0,
            as_token: None,
            alias_token: None,
        }
    }
}

fn parse_use_statement(tokens: &TokenStream, use_token: usize) -> Vec<UseImport> {
    let Some(statement_end) = tokens.find_next(use_token + 1, tokens.len(), |t| t.is_punct(";"))
    else {
        return Vec::new();
    };
    let Some(mut cursor) = tokens.next_code(use_token) else {
        return Vec::new();
    };

    let mut statement_kind = ImportKind::Class;
    if tokens[cursor].is_keyword("function") {
        statement_kind = ImportKind::Function;
        cursor += 1;
    } else if tokens[cursor].is_keyword("const") {
        statement_kind = ImportKind::Const;
        cursor += 1;
    }

    let mut prefix = String::new();
    let mut grouped = false;
    let mut clauses: Vec<PendingClause> = Vec::new();
    let mut current = PendingClause::new(statement_kind);

    for idx in cursor..statement_end {
        let token = &tokens[idx];
        if !token.is_code() {
            continue;
        }

        if token.is_keyword("as") {
            current.as_token = Some(idx);
        } else if token.is_punct("{") {
            prefix = std::mem::take(&mut current.name);
            grouped = true;
            current = PendingClause::new(statement_kind);
        } else if token.is_punct(",") || token.is_punct("}") {
            let next = PendingClause::new(statement_kind);
            clauses.push(std::mem::replace(&mut current, next));
        } else if grouped && current.first.is_none() && token.is_any_keyword(&["function", "const"]) {
            current.kind = if token.is_keyword("function") {
                ImportKind::Function
            } else {
                ImportKind::Const
            };
        } else if current.as_token.is_some() {
            current.alias_token = Some(idx);
        } else if token.is_name() || token.is_ns_separator() || token.kind == TokenKind::Keyword {
            current.name.push_str(&token.text);
            current.first.get_or_insert(idx);
            current.last = idx;
        }
    }
    clauses.push(current);

    let clause_count = clauses.iter().filter(|clause| clause.first.is_some()).count();
    clauses
        .into_iter()
        .filter_map(|clause| {
            let name_first = clause.first?;
            let full_name = if grouped {
                normalize_type_name(&format!("{prefix}\\{}", clause.name))
            } else {
                normalize_type_name(&clause.name)
            };
            let explicit_alias = clause.alias_token.is_some();
            let alias = match clause.alias_token {
                Some(alias) => tokens[alias].text.clone(),
                None => full_name.rsplit('\\').next().unwrap_or_default().to_string(),
            };
            if alias.is_empty() {
                return None;
            }

            Some(UseImport {
                kind: clause.kind,
                full_name,
                alias,
                explicit_alias,
                use_token,
                name_first,
                name_last: clause.last,
                as_token: clause.as_token,
                alias_token: clause.alias_token,
                statement_end,
                clause_count,
                grouped,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::rules::test_utils::parse_php;

    fn context(source: &str) -> (FileContext, TokenStream) {
        let parsed = parse_php(source);
        (FileContext::from_tokens(&parsed.tokens), parsed.tokens)
    }

    #[test]
    fn normalizes_backslash_runs() {
        assert_eq!(normalize_type_name("\\\\App\\\\Legacy\\Foo"), "App\\Legacy\\Foo");
        assert_eq!(normalize_type_name("Foo"), "Foo");
    }

    #[test]
    fn parses_single_grouped_and_aliased_imports() {
        let source = r#"<?php
namespace App\Service;

use App\Legacy\Foo;
use Vendor\Lib\{Client, Server as Host};
use function Vendor\helper;
use Other\Thing as Alias, Another\Piece;

final class Worker
{
    use SomeTrait;
}
"#;
        let (context, _) = context(source);
        let imports: Vec<(&str, &str, ImportKind)> = context
            .imports()
            .iter()
            .map(|i| (i.full_name.as_str(), i.alias.as_str(), i.kind))
            .collect();

        assert_eq!(
            imports,
            vec![
                ("App\\Legacy\\Foo", "Foo", ImportKind::Class),
                ("Vendor\\Lib\\Client", "Client", ImportKind::Class),
                ("Vendor\\Lib\\Server", "Host", ImportKind::Class),
                ("Vendor\\helper", "helper", ImportKind::Function),
                ("Other\\Thing", "Alias", ImportKind::Class),
                ("Another\\Piece", "Piece", ImportKind::Class),
            ]
        );
        assert!(context.imports()[2].grouped);
        assert_eq!(context.imports()[4].clause_count, 2);
        assert!(context.declares_type("worker"));
    }

    #[test]
    fn first_registered_alias_wins() {
        let source = "<?php\nuse First\\Foo;\nuse Second\\Foo;\n";
        let (context, _) = context(source);
        let import = context.class_import("foo").expect("import");
        assert_eq!(import.full_name, "First\\Foo");
    }

    #[test]
    fn candidates_follow_resolution_priority() {
        let source = "<?php\nnamespace App;\nuse NS\\Parser;\nfunction f(Parser\\Sub $a, Local $b, \\Other\\Foo $c) {}\n";
        let (context, tokens) = context(source);

        let find = |text: &str| {
            tokens
                .iter()
                .find(|(_, t)| t.text == text)
                .map(|(idx, _)| idx)
                .expect("token")
        };

        let sub = find("Sub");
        let name = qualified_name_at(&tokens, sub).expect("name");
        assert_eq!(name.segments, vec!["Parser", "Sub"]);
        assert_eq!(
            context.resolution_candidates(&name, sub),
            vec!["Parser\\Sub", "NS\\Parser\\Sub", "Sub"]
        );

        let local = find("Local");
        let name = qualified_name_at(&tokens, local).expect("name");
        assert_eq!(
            context.resolution_candidates(&name, local),
            vec!["Local", "App\\Local"]
        );

        let foo = find("Foo");
        let name = qualified_name_at(&tokens, foo).expect("name");
        assert!(name.fully_qualified);
        assert_eq!(context.resolution_candidates(&name, foo), vec!["Other\\Foo"]);
    }
}
