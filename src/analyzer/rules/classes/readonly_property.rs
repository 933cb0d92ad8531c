use super::DiagnosticRule;
use super::helpers::diagnostic_for_token;
use crate::analyzer::classifier::{class_declaration, class_properties};
use crate::analyzer::names::FileContext;
use crate::analyzer::{Diagnostic, Severity, parser};

/// Typed instance properties must be `readonly`. Static and untyped properties
/// cannot be, and readonly classes cover their properties already.
pub struct ReadonlyPropertyRule;

impl ReadonlyPropertyRule {
    pub fn new() -> Self {
        Self
    }
}

impl DiagnosticRule for ReadonlyPropertyRule {
    fn name(&self) -> &str {
        "classes/readonly_property"
    }

    fn run(&self, parsed: &parser::ParsedSource, _context: &FileContext) -> Vec<Diagnostic> {
        let tokens = &parsed.tokens;
        let mut diagnostics = Vec::new();

        for (idx, token) in tokens.iter() {
            if !token.is_keyword("class") {
                continue;
            }
            let Some(class) = class_declaration(tokens, idx) else {
                continue;
            };
            if class.readonly_modifier.is_some() {
                continue;
            }

            for property in class_properties(tokens, class.opener) {
                if !property.has_type || property.is_static || property.readonly.is_some() {
                    continue;
                }
                diagnostics.push(diagnostic_for_token(
                    parsed,
                    property.variable,
                    Severity::Error,
                    self.name(),
                    format!(
                        "Property {} must be readonly",
                        tokens[property.variable].text
                    ),
                ));
            }
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
    fn reports_typed_mutable_properties() {
        let source = r#"<?php
final class Order
{
    private int $id;
    private readonly string $number;
    private static int $counter = 0;
    private $untyped;

    public function __construct(private ?Customer $customer, private readonly array $lines)
    {
    }
}
"#;
        let parsed = parse_php(source);
        let diagnostics = run_rule(&ReadonlyPropertyRule::new(), &parsed);

        assert_diagnostics_exact(
            &diagnostics,
            &[
                "error: Property $id must be readonly",
                "error: Property $customer must be readonly",
            ],
        );
    }

    #[test]
    fn readonly_classes_are_skipped() {
        let source = r#"<?php
final readonly class Money
{
    public function __construct(private int $amount, private string $currency)
    {
    }
}
"#;
        let parsed = parse_php(source);
        assert_no_diagnostics(&run_rule(&ReadonlyPropertyRule::new(), &parsed));
    }
}
