use std::collections::HashMap;

use super::DiagnosticRule;
use super::helpers::diagnostic_for_tokens;
use crate::analyzer::classifier::type_declaration_context;
use crate::analyzer::config::ForbiddenTypesConfig;
use crate::analyzer::names::{FileContext, normalize_type_name, qualified_name_at};
use crate::analyzer::{Diagnostic, Severity, parser};

const CODE: &str = "types/forbidden_types";

/// Reports types in parameter, return and property declarations that resolve to
/// an entry of the configured table.
pub struct ForbiddenTypesRule {
    /// Case-folded canonical name to the canonical name and its configured message.
    table: HashMap<String, (String, Option<String>)>,
}

impl ForbiddenTypesRule {
    pub fn new(config: &ForbiddenTypesConfig) -> Self {
        let table = config
            .types
            .iter()
            .filter_map(|(name, message)| {
                let canonical = normalize_type_name(name);
                if canonical.is_empty() {
                    return None;
                }
                let message = message
                    .as_deref()
                    .map(str::trim)
                    .filter(|message| !message.is_empty())
                    .map(str::to_owned);
                Some((canonical.to_ascii_lowercase(), (canonical, message)))
            })
            .collect();

        Self { table }
    }

    fn check(
        &self,
        parsed: &parser::ParsedSource,
        context: &FileContext,
        idx: usize,
    ) -> Option<Diagnostic> {
        let tokens = &parsed.tokens;
        // only the trailing segment of a qualified name is checked
        if tokens.get(idx + 1).is_some_and(|next| next.is_ns_separator()) {
            return None;
        }
        type_declaration_context(tokens, idx)?;

        let name = qualified_name_at(tokens, idx)?;
        let (canonical, message) = context
            .resolution_candidates(&name, idx)
            .iter()
            .find_map(|candidate| self.table.get(&candidate.to_ascii_lowercase()))?;

        let message = message
            .clone()
            .unwrap_or_else(|| format!("Type '{canonical}' is forbidden"));
        Some(diagnostic_for_tokens(
            parsed,
            name.first,
            name.last,
            Severity::Error,
            CODE,
            message,
        ))
    }
}

impl DiagnosticRule for ForbiddenTypesRule {
    fn name(&self) -> &str {
        CODE
    }

    fn run(&self, parsed: &parser::ParsedSource, context: &FileContext) -> Vec<Diagnostic> {
        if self.table.is_empty() {
            return Vec::new();
        }

        parsed
            .tokens
            .iter()
            .filter(|(_, token)| token.is_name())
            .filter_map(|(idx, _)| self.check(parsed, context, idx))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::rules::test_utils::{
        assert_diagnostics_exact, assert_no_diagnostics, parse_php, run_rule,
    };

    fn rule(entries: &[(&str, Option<&str>)]) -> ForbiddenTypesRule {
        let config = ForbiddenTypesConfig {
            types: entries
                .iter()
                .map(|(name, message)| (name.to_string(), message.map(str::to_string)))
                .collect(),
        };
        ForbiddenTypesRule::new(&config)
    }

    #[test]
    fn imported_parameter_type_uses_configured_message() {
        let source = r#"<?php
use App\Legacy\Foo;

function f(Foo $x): void {}
"#;
        let parsed = parse_php(source);
        let diagnostics = run_rule(
            &rule(&[("App\\Legacy\\Foo", Some("use App\\Foo instead"))]),
            &parsed,
        );

        assert_diagnostics_exact(&diagnostics, &["error: use App\\Foo instead"]);
        assert_eq!(diagnostics[0].line(), 4);
    }

    #[test]
    fn unrelated_fully_qualified_name_is_not_flagged() {
        let source = r#"<?php
use NS\Foo;

function f(\Other\Foo $x) {}
"#;
        let parsed = parse_php(source);
        let diagnostics = run_rule(&rule(&[("NS\\Foo", None)]), &parsed);
        assert_no_diagnostics(&diagnostics);
    }

    #[test]
    fn default_message_and_all_declaration_positions() {
        let source = r#"<?php
namespace App;

final class Holder
{
    private ?\DateTime $created;

    public function __construct(private \DateTime|int $at)
    {
        $copy = new \DateTime();
        $ok = $copy instanceof \DateTime;
    }

    public function get(): \DateTime
    {
        return $this->created;
    }
}
"#;
        let parsed = parse_php(source);
        let diagnostics = run_rule(&rule(&[("\\\\DateTime", None)]), &parsed);

        assert_diagnostics_exact(
            &diagnostics,
            &[
                "error: Type 'DateTime' is forbidden",
                "error: Type 'DateTime' is forbidden",
                "error: Type 'DateTime' is forbidden",
            ],
        );
        let lines: Vec<usize> = diagnostics.iter().map(Diagnostic::line).collect();
        assert_eq!(lines, vec![6, 8, 14]);
    }

    #[test]
    fn partial_import_resolves_through_alias() {
        let source = r#"<?php
use NS\Parser;

function parse(Parser\Sub $node) {}
"#;
        let parsed = parse_php(source);
        let diagnostics = run_rule(&rule(&[("NS\\Parser\\Sub", Some("no sub parsers"))]), &parsed);
        assert_diagnostics_exact(&diagnostics, &["error: no sub parsers"]);
    }

    #[test]
    fn namespace_relative_name_is_resolved() {
        let source = r#"<?php
namespace App\Model;

function load(User $user) {}
"#;
        let parsed = parse_php(source);
        let diagnostics = run_rule(&rule(&[("App\\Model\\User", None)]), &parsed);
        assert_diagnostics_exact(&diagnostics, &["error: Type 'App\\Model\\User' is forbidden"]);
    }
}
