use super::DiagnosticRule;
use super::helpers::diagnostic_for_token;
use crate::analyzer::classifier::{function_parameters_open, parameters};
use crate::analyzer::names::FileContext;
use crate::analyzer::{Diagnostic, Severity, parser};

/// Parameters must not declare default values; callers pass every argument.
pub struct ForbiddenDefaultArgumentRule;

impl ForbiddenDefaultArgumentRule {
    pub fn new() -> Self {
        Self
    }
}

impl DiagnosticRule for ForbiddenDefaultArgumentRule {
    fn name(&self) -> &str {
        "functions/forbidden_default_argument"
    }

    fn run(&self, parsed: &parser::ParsedSource, _context: &FileContext) -> Vec<Diagnostic> {
        let tokens = &parsed.tokens;
        let mut diagnostics = Vec::new();

        for (idx, token) in tokens.iter() {
            if !token.is_any_keyword(&["function", "fn"]) {
                continue;
            }
            let Some(open) = function_parameters_open(tokens, idx) else {
                continue;
            };

            diagnostics.extend(
                parameters(tokens, open)
                    .into_iter()
                    .filter(|param| param.default.is_some())
                    .map(|param| {
                        diagnostic_for_token(
                            parsed,
                            param.variable,
                            Severity::Error,
                            self.name(),
                            format!(
                                "Default value for parameter {} is forbidden",
                                tokens[param.variable].text
                            ),
                        )
                    }),
            );
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
    fn reports_parameters_with_defaults() {
        let source = r#"<?php
function connect(string $host, int $port = 5432, array $options = ['timeout' => 5]) {}

$retry = function (int $times = 3) {};
"#;
        let parsed = parse_php(source);
        let diagnostics = run_rule(&ForbiddenDefaultArgumentRule::new(), &parsed);

        assert_diagnostics_exact(
            &diagnostics,
            &[
                "error: Default value for parameter $port is forbidden",
                "error: Default value for parameter $options is forbidden",
                "error: Default value for parameter $times is forbidden",
            ],
        );
    }

    #[test]
    fn assignments_in_bodies_are_not_defaults() {
        let source = r#"<?php
function build(array $parts) {
    $glue = ', ';
    return implode($glue, $parts);
}
"#;
        let parsed = parse_php(source);
        assert_no_diagnostics(&run_rule(&ForbiddenDefaultArgumentRule::new(), &parsed));
    }
}
