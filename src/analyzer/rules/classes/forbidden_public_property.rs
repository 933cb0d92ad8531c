use super::DiagnosticRule;
use super::helpers::diagnostic_for_token;
use crate::analyzer::classifier::{class_declaration, class_properties};
use crate::analyzer::config::PublicPropertiesConfig;
use crate::analyzer::names::FileContext;
use crate::analyzer::{Diagnostic, Severity, parser};

/// Properties are accessed through methods; `public readonly` may be allowed.
pub struct ForbiddenPublicPropertyRule {
    allow_readonly: bool,
}

impl ForbiddenPublicPropertyRule {
    pub fn new(config: &PublicPropertiesConfig) -> Self {
        Self {
            allow_readonly: config.allow_readonly,
        }
    }
}

impl DiagnosticRule for ForbiddenPublicPropertyRule {
    fn name(&self) -> &str {
        "classes/forbidden_public_property"
    }

    fn run(&self, parsed: &parser::ParsedSource, _context: &FileContext) -> Vec<Diagnostic> {
        let tokens = &parsed.tokens;
        let mut diagnostics = Vec::new();

        for (idx, token) in tokens.iter() {
            if !token.is_any_keyword(&["class", "trait"]) {
                continue;
            }
            let Some(opener) = tokens.scope_opener(idx) else {
                continue;
            };
            let readonly_class = class_declaration(tokens, idx)
                .is_some_and(|class| class.readonly_modifier.is_some());

            for property in class_properties(tokens, opener) {
                let is_public = property
                    .visibility
                    .is_none_or(|visibility| tokens[visibility].is_keyword("public"));
                if !is_public {
                    continue;
                }
                let readonly = readonly_class || property.readonly.is_some();
                if readonly && self.allow_readonly {
                    continue;
                }

                diagnostics.push(diagnostic_for_token(
                    parsed,
                    property.variable,
                    Severity::Error,
                    self.name(),
                    format!(
                        "Public property {} is forbidden",
                        tokens[property.variable].text
                    ),
                ));
            }
        }

        diagnostics
    }
}
