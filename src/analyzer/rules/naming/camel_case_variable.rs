use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::DiagnosticRule;
use super::helpers::diagnostic_for_token;
use crate::analyzer::names::FileContext;
use crate::analyzer::{Diagnostic, Severity, parser};

static CAMEL_CASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-zA-Z0-9]*$").expect("valid camelCase pattern"));

const EXEMPT: &[&str] = &[
    "this", "GLOBALS", "_SERVER", "_GET", "_POST", "_FILES", "_COOKIE", "_SESSION", "_REQUEST",
    "_ENV", "http_response_header", "argc", "argv",
];

/// Variables are written in camelCase; each offending name is reported once per file.
pub struct CamelCaseVariableRule;

impl CamelCaseVariableRule {
    pub fn new() -> Self {
        Self
    }
}

impl DiagnosticRule for CamelCaseVariableRule {
    fn name(&self) -> &str {
        "naming/camel_case_variable"
    }

    fn run(&self, parsed: &parser::ParsedSource, _context: &FileContext) -> Vec<Diagnostic> {
        let mut reported = HashSet::new();
        let mut diagnostics = Vec::new();

        for (idx, token) in parsed.tokens.iter() {
            if !token.is_variable() {
                continue;
            }
            let name = &token.text[1..];
            if EXEMPT.contains(&name) || CAMEL_CASE.is_match(name) {
                continue;
            }
            if !reported.insert(name.to_string()) {
                continue;
            }

            diagnostics.push(diagnostic_for_token(
                parsed,
                idx,
                Severity::Warning,
                self.name(),
                format!("Variable {} is not in camelCase", token.text),
            ));
        }

        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::rules::test_utils::{
        assert_diagnostics_exact, assert_no_diagnostics, parse_php, run_rule,
    };

    #[test]
    fn reports_each_offending_name_once() {
        let source = r#"<?php
$user_name = 'a';
$UserId = 1;
echo $user_name;
$total2 = $user_name . $UserId;
"#;
        let parsed = parse_php(source);
        let diagnostics = run_rule(&CamelCaseVariableRule::new(), &parsed);
        assert_diagnostics_exact(
            &diagnostics,
            &[
                "warning: Variable $user_name is not in camelCase",
                "warning: Variable $UserId is not in camelCase",
            ],
        );
    }

    #[test]
    fn superglobals_and_this_are_exempt() {
        let source = r#"<?php
final class Request
{
    public function query(): array
    {
        return [$_GET, $_SERVER, $GLOBALS, $this];
    }
}
"#;
        let parsed = parse_php(source);
        assert_no_diagnostics(&run_rule(&CamelCaseVariableRule::new(), &parsed));
    }
}
