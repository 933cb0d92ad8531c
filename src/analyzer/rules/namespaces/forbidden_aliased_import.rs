use std::sync::LazyLock;

use regex::Regex;

use super::DiagnosticRule;
use super::helpers::diagnostic_for_tokens;
use crate::analyzer::classifier::type_declaration_context;
use crate::analyzer::fix::ChangeSet;
use crate::analyzer::names::{FileContext, ImportKind, UseImport};
use crate::analyzer::tokens::TokenStream;
use crate::analyzer::{Diagnostic, Severity, parser};

const CODE: &str = "namespaces/forbidden_aliased_import";

/// Class imports keep their own short name unless another name in the file
/// already claims it.
pub struct ForbiddenAliasedImportRule;

impl ForbiddenAliasedImportRule {
    pub fn new() -> Self {
        Self
    }

    fn is_justified(context: &FileContext, import: &UseImport) -> bool {
        let short_name = import.short_name();
        if context.declares_type(short_name) {
            return true;
        }

        context.imports().iter().any(|other| {
            other.kind == ImportKind::Class
                && !std::ptr::eq(other, import)
                && other.alias.eq_ignore_ascii_case(short_name)
        })
    }

    fn findings(
        &self,
        parsed: &parser::ParsedSource,
        context: &FileContext,
    ) -> Vec<(Diagnostic, Option<ChangeSet>)> {
        let tokens = &parsed.tokens;
        let mut findings = Vec::new();

        for import in context.imports() {
            if import.kind != ImportKind::Class || !import.explicit_alias {
                continue;
            }
            if Self::is_justified(context, import) {
                continue;
            }
            let Some(alias_token) = import.alias_token else {
                continue;
            };

            let fixable = import.clause_count == 1 && !import.grouped;
            let mut diagnostic = diagnostic_for_tokens(
                parsed,
                import.name_first,
                alias_token,
                Severity::Error,
                CODE,
                format!(
                    "Aliased import {} as {} is forbidden; import it as {}",
                    import.full_name,
                    import.alias,
                    import.short_name()
                ),
            );
            if !fixable {
                findings.push((diagnostic, None));
                continue;
            }
            diagnostic = diagnostic.fixable();

            let mut change_set = ChangeSet::new(CODE, tokens, import.use_token);
            change_set.replace_tokens(tokens, import.name_last + 1, alias_token, "");
            if !import.alias.eq_ignore_ascii_case(import.short_name()) {
                for reference in alias_references(tokens, context, &import.alias) {
                    change_set.replace_token(tokens, reference, import.short_name());
                }
                let doc_comments = tokens
                    .iter()
                    .filter(|(_, token)| token.is_comment() && token.text.starts_with("/**"));
                for (idx, token) in doc_comments {
                    if let Some(text) =
                        rename_in_doc_comment(&token.text, &import.alias, import.short_name())
                    {
                        change_set.replace_token(tokens, idx, text);
                    }
                }
            }
            findings.push((diagnostic, Some(change_set)));
        }

        findings
    }
}

/// Name tokens outside `use` statements that refer to the class imported as `alias`.
/// Only class positions count: a bare constant or function call of the same
/// name resolves through a different table.
fn alias_references(tokens: &TokenStream, context: &FileContext, alias: &str) -> Vec<usize> {
    let in_use_statement = |idx: usize| {
        context
            .imports()
            .iter()
            .any(|import| import.use_token < idx && idx <= import.statement_end)
    };

    tokens
        .iter()
        .filter(|(idx, token)| {
            token.is_name() && token.text.eq_ignore_ascii_case(alias) && !in_use_statement(*idx)
        })
        .filter(|(idx, _)| *idx == 0 || !tokens[idx - 1].is_ns_separator())
        .filter(|(idx, _)| is_class_position(tokens, *idx))
        .map(|(idx, _)| idx)
        .collect()
}

fn is_class_position(tokens: &TokenStream, idx: usize) -> bool {
    // `Alias\Sub` uses the alias as a namespace prefix.
    if tokens.get(idx + 1).is_some_and(|next| next.is_ns_separator()) {
        return true;
    }
    if tokens
        .next_code(idx)
        .is_some_and(|next| tokens[next].is_punct("::"))
    {
        return true;
    }
    if type_declaration_context(tokens, idx).is_some() {
        return true;
    }

    let Some(prev) = tokens.prev_code(idx) else {
        return false;
    };
    let prev_token = &tokens[prev];
    if prev_token.is_any_keyword(&["new", "instanceof", "extends", "implements", "insteadof"])
        || prev_token.is_punct("#[")
    {
        return true;
    }
    if prev_token.is_keyword("use") {
        // Trait use inside a class body.
        return tokens
            .enclosing_owner(idx, &["class", "trait", "enum"])
            .is_some();
    }
    if prev_token.is_punct(",") && in_inheritance_list(tokens, prev) {
        return true;
    }
    if prev_token.is_punct("(") || prev_token.is_punct("|") {
        return tokens
            .enclosing_paren(idx)
            .and_then(|open| tokens.prev_code(open))
            .is_some_and(|keyword| tokens[keyword].is_keyword("catch"));
    }
    false
}

/// Whether the `,` at `comma` separates names after `extends` or `implements`.
fn in_inheritance_list(tokens: &TokenStream, comma: usize) -> bool {
    let mut cursor = comma;
    while let Some(prev) = tokens.prev_code(cursor) {
        let token = &tokens[prev];
        if token.is_any_keyword(&["extends", "implements"]) {
            return true;
        }
        if !(token.is_name() || token.is_ns_separator() || token.is_punct(",")) {
            return false;
        }
        cursor = prev;
    }
    false
}

static DOC_TAG_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[A-Za-z][\w-]*[ \t]+(\S+)").expect("valid doc tag pattern"));

/// Rewrites `alias` to `short_name` in the type word following each tag of a
/// doc comment. Returns `None` when nothing changes.
fn rename_in_doc_comment(text: &str, alias: &str, short_name: &str) -> Option<String> {
    let mut output = String::with_capacity(text.len());
    let mut copied = 0;
    let mut changed = false;

    for captures in DOC_TAG_TYPE.captures_iter(text) {
        let Some(type_word) = captures.get(1) else {
            continue;
        };
        output.push_str(&text[copied..type_word.start()]);
        let renamed = rename_in_type_word(type_word.as_str(), alias, short_name);
        changed |= renamed != type_word.as_str();
        output.push_str(&renamed);
        copied = type_word.end();
    }

    if !changed {
        return None;
    }
    output.push_str(&text[copied..]);
    Some(output)
}

fn rename_in_type_word(word: &str, alias: &str, short_name: &str) -> String {
    let is_name_char = |c: char| c.is_alphanumeric() || c == '_' || c == '\\';
    let mut output = String::with_capacity(word.len());
    let mut rest = word;

    while let Some(start) = rest.find(is_name_char) {
        let (before, tail) = rest.split_at(start);
        let end = tail.find(|c: char| !is_name_char(c)).unwrap_or(tail.len());
        let (name, after) = tail.split_at(end);
        output.push_str(before);

        let preceded_by_sigil = before.ends_with('$');
        let (head, qualified_tail) = name.split_once('\\').unwrap_or((name, ""));
        if !preceded_by_sigil && head.eq_ignore_ascii_case(alias) {
            output.push_str(short_name);
            if name.contains('\\') {
                output.push('\\');
                output.push_str(qualified_tail);
            }
        } else {
            output.push_str(name);
        }
        rest = after;
    }
    output.push_str(rest);
    output
}

impl DiagnosticRule for ForbiddenAliasedImportRule {
    fn name(&self) -> &str {
        CODE
    }

    fn run(&self, parsed: &parser::ParsedSource, context: &FileContext) -> Vec<Diagnostic> {
        self.findings(parsed, context)
            .into_iter()
            .map(|(diagnostic, _)| diagnostic)
            .collect()
    }

    fn fix(&self, parsed: &parser::ParsedSource, context: &FileContext) -> Vec<ChangeSet> {
        self.findings(parsed, context)
            .into_iter()
            .filter_map(|(_, change_set)| change_set)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::rules::test_utils::{
        assert_diagnostics_exact, assert_fix, assert_idempotent, assert_no_diagnostics,
        parse_php, run_rule,
    };

    #[test]
    fn alias_without_collision_is_reported_and_fixed() {
        let input = r#"<?php
use Foo\Bar as Baz;

final class Handler
{
    public function handle(Baz $bar): Baz
    {
        $this->Baz = Baz::create();
        return new Baz();
    }
}
"#;
        let expected = r#"<?php
use Foo\Bar;

final class Handler
{
    public function handle(Bar $bar): Bar
    {
        $this->Baz = Bar::create();
        return new Bar();
    }
}
"#;
        let parsed = parse_php(input);
        let diagnostics = run_rule(&ForbiddenAliasedImportRule::new(), &parsed);
        assert_diagnostics_exact(
            &diagnostics,
            &["error: Aliased import Foo\\Bar as Baz is forbidden; import it as Bar"],
        );
        assert!(diagnostics[0].fixable);

        assert_fix(&ForbiddenAliasedImportRule::new(), input, expected);
        assert_idempotent(&ForbiddenAliasedImportRule::new(), expected);
    }

    #[test]
    fn declared_class_with_short_name_justifies_alias() {
        let source = r#"<?php
use Foo\Bar as Baz;

final class Bar
{
}
"#;
        let parsed = parse_php(source);
        assert_no_diagnostics(&run_rule(&ForbiddenAliasedImportRule::new(), &parsed));
    }

    #[test]
    fn colliding_imports_justify_alias() {
        let source = r#"<?php
use App\Model\User;
use Vendor\Auth\User as AuthUser;
"#;
        let parsed = parse_php(source);
        assert_no_diagnostics(&run_rule(&ForbiddenAliasedImportRule::new(), &parsed));
    }

    #[test]
    fn grouped_alias_is_reported_without_fix() {
        let input = "<?php\nuse Vendor\\{Client as HttpClient, Server};\n";
        let parsed = parse_php(input);
        let diagnostics = run_rule(&ForbiddenAliasedImportRule::new(), &parsed);
        assert_eq!(diagnostics.len(), 1);
        assert!(!diagnostics[0].fixable);
        assert_fix(&ForbiddenAliasedImportRule::new(), input, input);
    }

    #[test]
    fn constants_and_functions_sharing_the_alias_are_kept() {
        let input = r#"<?php
namespace App;

use Foo\Bar as Baz;

final class Handler
{
    public function total(): int
    {
        return Baz::X + \Other\Baz::Y + Baz + Baz();
    }
}
"#;
        let expected = r#"<?php
namespace App;

use Foo\Bar;

final class Handler
{
    public function total(): int
    {
        return Bar::X + \Other\Baz::Y + Baz + Baz();
    }
}
"#;
        assert_fix(&ForbiddenAliasedImportRule::new(), input, expected);
        assert_idempotent(&ForbiddenAliasedImportRule::new(), expected);
    }

    #[test]
    fn class_positions_are_renamed() {
        let input = r#"<?php
use Foo\Bar as Baz;

final class Handler extends Base implements Countable, Baz
{
    use Baz;

    public function handle(object $value): void
    {
        try {
            $ok = $value instanceof Baz;
        } catch (\RuntimeException | Baz $e) {
        }
    }
}
"#;
        let expected = r#"<?php
use Foo\Bar;

final class Handler extends Base implements Countable, Bar
{
    use Bar;

    public function handle(object $value): void
    {
        try {
            $ok = $value instanceof Bar;
        } catch (\RuntimeException | Bar $e) {
        }
    }
}
"#;
        assert_fix(&ForbiddenAliasedImportRule::new(), input, expected);
    }

    #[test]
    fn doc_comment_types_follow_the_rename() {
        let input = r#"<?php
use Foo\Bar as Baz;

final class Handler
{
    /**
     * Baz instances are cached.
     *
     * @param Baz|null $baz
     * @return Baz\Item[]
     */
    public function handle(?Baz $baz): array
    {
        return [];
    }
}
"#;
        let expected = r#"<?php
use Foo\Bar;

final class Handler
{
    /**
     * Baz instances are cached.
     *
     * @param Bar|null $baz
     * @return Bar\Item[]
     */
    public function handle(?Bar $baz): array
    {
        return [];
    }
}
"#;
        assert_fix(&ForbiddenAliasedImportRule::new(), input, expected);
        assert_idempotent(&ForbiddenAliasedImportRule::new(), expected);
    }

    #[test]
    fn doc_tag_type_word_rename_skips_variables_and_qualified_names() {
        assert_eq!(
            rename_in_doc_comment("/** @var Baz|\\Other\\Baz $Baz */", "Baz", "Bar").as_deref(),
            Some("/** @var Bar|\\Other\\Baz $Baz */"),
        );
        assert_eq!(rename_in_doc_comment("/** Baz only in prose */", "Baz", "Bar"), None);
    }
}
