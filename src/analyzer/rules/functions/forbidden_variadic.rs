use super::DiagnosticRule;
use super::helpers::diagnostic_for_tokens;
use crate::analyzer::classifier::{function_parameters_open, parameters};
use crate::analyzer::names::FileContext;
use crate::analyzer::{Diagnostic, Severity, parser};

pub struct ForbiddenVariadicRule;

impl ForbiddenVariadicRule {
    pub fn new() -> Self {
        Self
    }
}

impl DiagnosticRule for ForbiddenVariadicRule {
    fn name(&self) -> &str {
        "functions/forbidden_variadic"
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

            for param in parameters(tokens, open) {
                let Some(ellipsis) = param.variadic else {
                    continue;
                };
                diagnostics.push(diagnostic_for_tokens(
                    parsed,
                    ellipsis,
                    param.variable,
                    Severity::Error,
                    self.name(),
                    format!("Variadic parameter {} is forbidden", tokens[param.variable].text),
                ));
            }
        }

        diagnostics
    }
}
