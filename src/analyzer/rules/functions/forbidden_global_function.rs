use super::DiagnosticRule;
use super::helpers::diagnostic_for_token;
use crate::analyzer::classifier::{CLASS_LIKE, function_name};
use crate::analyzer::names::FileContext;
use crate::analyzer::{Diagnostic, Severity, parser};

pub struct ForbiddenGlobalFunctionRule;

impl ForbiddenGlobalFunctionRule {
    pub fn new() -> Self {
        Self
    }
}

impl DiagnosticRule for ForbiddenGlobalFunctionRule {
    fn name(&self) -> &str {
        "functions/forbidden_global_function"
    }

    fn run(&self, parsed: &parser::ParsedSource, _context: &FileContext) -> Vec<Diagnostic> {
        let tokens = &parsed.tokens;
        let mut diagnostics = Vec::new();

        for (idx, token) in tokens.iter() {
            if !token.is_keyword("function") {
                continue;
            }
            // `use function Foo\bar;`
            if tokens
                .prev_code(idx)
                .is_some_and(|prev| tokens[prev].is_keyword("use"))
            {
                continue;
            }
            let Some(name) = function_name(tokens, idx) else {
                continue;
            };
            if tokens.enclosing_owner(idx, CLASS_LIKE).is_some() {
                continue;
            }

            diagnostics.push(diagnostic_for_token(
                parsed,
                name,
                Severity::Error,
                self.name(),
                format!("Global function {}() is forbidden", tokens[name].text),
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
    fn reports_functions_outside_class_likes() {
        let source = r#"<?php
namespace App;

function helper(): int
{
    return 1;
}

function &reference(): array
{
    static $cache = [];
    return $cache;
}
"#;
        let parsed = parse_php(source);
        let diagnostics = run_rule(&ForbiddenGlobalFunctionRule::new(), &parsed);

        assert_diagnostics_exact(
            &diagnostics,
            &[
                "error: Global function helper() is forbidden",
                "error: Global function reference() is forbidden",
            ],
        );
    }

    #[test]
    fn methods_closures_and_imports_are_fine() {
        let source = r#"<?php
use function Vendor\helper;

final class Service
{
    public function run(): void
    {
        $callback = function () {};
        $arrow = fn () => 1;
    }
}

trait Greets
{
    public function greet(): string
    {
        return 'hi';
    }
}
"#;
        let parsed = parse_php(source);
        assert_no_diagnostics(&run_rule(&ForbiddenGlobalFunctionRule::new(), &parsed));
    }
}
