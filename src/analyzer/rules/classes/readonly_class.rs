//! Readonly class promotion.
//!
//! A `final` class that neither extends another class nor is abstract, whose
//! properties are all typed, non-static and individually `readonly`, is declared
//! `readonly class` instead. Only final, non-extending classes qualify because
//! readonly-ness must match across the inheritance chain. Inside a readonly class
//! a per-property `readonly` is redundant.

use super::DiagnosticRule;
use super::helpers::diagnostic_for_token;
use crate::analyzer::classifier::{ClassDeclaration, Property, class_declaration, class_properties};
use crate::analyzer::config::ReadonlyClassesConfig;
use crate::analyzer::fix::ChangeSet;
use crate::analyzer::names::FileContext;
use crate::analyzer::tokens::TokenStream;
use crate::analyzer::{Diagnostic, Severity, parser};

const PROMOTE: &str = "classes/readonly_class/promote";
const PARTIAL: &str = "classes/readonly_class/partial";
const REDUNDANT: &str = "classes/readonly_class/redundant_readonly";

enum ClassState {
    /// Every property is readonly: promote the class.
    ShouldBeReadonly(Vec<ReadonlyModifier>),
    /// Eligible, but only some properties are readonly.
    PartiallyReadonly,
    /// Readonly class whose properties repeat the modifier.
    RedundantModifiers(Vec<ReadonlyModifier>),
    Unchanged,
}

/// A property's `readonly` token and whether it is the property's only modifier.
struct ReadonlyModifier {
    token: usize,
    sole_modifier: bool,
}

impl ReadonlyModifier {
    /// Drops the modifier. A bare `readonly` still marks the member as a property
    /// (or a promoted parameter), so it becomes `public` instead of disappearing.
    fn drop_from(&self, change_set: &mut ChangeSet, tokens: &TokenStream) {
        if self.sole_modifier {
            change_set.replace_token(tokens, self.token, "public");
        } else {
            change_set.remove_with_trailing_whitespace(tokens, self.token);
        }
    }
}

pub struct ReadonlyClassRule {
    promote: bool,
}

impl ReadonlyClassRule {
    pub fn new(config: &ReadonlyClassesConfig) -> Self {
        Self {
            promote: config.promote,
        }
    }

    fn classify(&self, class: &ClassDeclaration, properties: &[Property]) -> ClassState {
        let readonly_tokens: Vec<ReadonlyModifier> = properties
            .iter()
            .filter_map(|p| {
                p.readonly.map(|token| ReadonlyModifier {
                    token,
                    sole_modifier: p.visibility.is_none() && !p.is_static,
                })
            })
            .collect();

        if class.readonly_modifier.is_some() {
            return if readonly_tokens.is_empty() {
                ClassState::Unchanged
            } else {
                ClassState::RedundantModifiers(readonly_tokens)
            };
        }

        let eligible = self.promote
            && class.name.is_some()
            && class.final_modifier.is_some()
            && class.abstract_modifier.is_none()
            && !class.extends
            && !properties.is_empty()
            && properties.iter().all(|p| p.has_type && !p.is_static);
        if !eligible || readonly_tokens.is_empty() {
            return ClassState::Unchanged;
        }

        if readonly_tokens.len() == properties.len() {
            ClassState::ShouldBeReadonly(readonly_tokens)
        } else {
            ClassState::PartiallyReadonly
        }
    }

    fn findings(&self, parsed: &parser::ParsedSource) -> Vec<(Diagnostic, Option<ChangeSet>)> {
        let tokens = &parsed.tokens;
        let mut findings = Vec::new();

        for (idx, token) in tokens.iter() {
            if !token.is_keyword("class") {
                continue;
            }
            let Some(class) = class_declaration(tokens, idx) else {
                continue;
            };
            let properties = class_properties(tokens, class.opener);
            let class_name = class
                .name
                .map_or("class@anonymous", |name| tokens[name].text.as_str());

            match self.classify(&class, &properties) {
                ClassState::ShouldBeReadonly(readonly_tokens) => {
                    let diagnostic = diagnostic_for_token(
                        parsed,
                        class.name.unwrap_or(idx),
                        Severity::Error,
                        PROMOTE,
                        format!(
                            "Class {class_name} has only readonly properties and should be declared readonly"
                        ),
                    )
                    .fixable();

                    let mut change_set = ChangeSet::new(PROMOTE, tokens, idx);
                    change_set.add_content_before(tokens, idx, "readonly ");
                    for readonly in &readonly_tokens {
                        readonly.drop_from(&mut change_set, tokens);
                    }
                    findings.push((diagnostic, Some(change_set)));
                }
                ClassState::PartiallyReadonly => {
                    findings.push((
                        diagnostic_for_token(
                            parsed,
                            class.name.unwrap_or(idx),
                            Severity::Warning,
                            PARTIAL,
                            format!(
                                "Class {class_name} could be declared readonly if all its properties were readonly"
                            ),
                        ),
                        None,
                    ));
                }
                ClassState::RedundantModifiers(readonly_tokens) => {
                    for readonly in readonly_tokens {
                        let diagnostic = diagnostic_for_token(
                            parsed,
                            readonly.token,
                            Severity::Error,
                            REDUNDANT,
                            format!("Readonly modifier is redundant in readonly class {class_name}"),
                        )
                        .fixable();
                        let mut change_set = ChangeSet::new(REDUNDANT, tokens, readonly.token);
                        readonly.drop_from(&mut change_set, tokens);
                        findings.push((diagnostic, Some(change_set)));
                    }
                }
                ClassState::Unchanged => {}
            }
        }

        findings
    }
}

impl DiagnosticRule for ReadonlyClassRule {
    fn name(&self) -> &str {
        "classes/readonly_class"
    }

    fn run(&self, parsed: &parser::ParsedSource, _context: &FileContext) -> Vec<Diagnostic> {
        self.findings(parsed)
            .into_iter()
            .map(|(diagnostic, _)| diagnostic)
            .collect()
    }

    fn fix(&self, parsed: &parser::ParsedSource, _context: &FileContext) -> Vec<ChangeSet> {
        self.findings(parsed)
            .into_iter()
            .filter_map(|(_, change_set)| change_set)
            .collect()
    }
}
