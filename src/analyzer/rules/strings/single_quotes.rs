use super::DiagnosticRule;
use super::helpers::diagnostic_for_token;
use crate::analyzer::fix::ChangeSet;
use crate::analyzer::names::FileContext;
use crate::analyzer::tokens::TokenKind;
use crate::analyzer::{Diagnostic, Severity, parser};

/// Double quotes are reserved for strings that interpolate or escape.
pub struct SingleQuotesRule;

impl SingleQuotesRule {
    pub fn new() -> Self {
        Self
    }

    fn findings(&self, parsed: &parser::ParsedSource) -> Vec<(Diagnostic, ChangeSet)> {
        let tokens = &parsed.tokens;
        let mut findings = Vec::new();

        for (idx, token) in tokens.iter() {
            if token.kind != TokenKind::InterpolatedString {
                continue;
            }
            let Some(replacement) = single_quoted(&token.text) else {
                continue;
            };

            let diagnostic = diagnostic_for_token(
                parsed,
                idx,
                Severity::Error,
                self.name(),
                format!("String {} should use single quotes", token.text),
            )
            .fixable();
            let mut change_set = ChangeSet::new(self.name(), tokens, idx);
            change_set.replace_token(tokens, idx, replacement);
            findings.push((diagnostic, change_set));
        }

        findings
    }
}

/// Single-quoted form of a plain double-quoted literal.
fn single_quoted(text: &str) -> Option<String> {
    let (prefix, rest) = match text.strip_prefix(['b', 'B']) {
        Some(rest) => (&text[..1], rest),
        None => ("", text),
    };
    let content = rest.strip_prefix('"')?.strip_suffix('"')?;
    if content.contains(['$', '\\', '\'', '"']) {
        return None;
    }
    Some(format!("{prefix}'{content}'"))
}

impl DiagnosticRule for SingleQuotesRule {
    fn name(&self) -> &str {
        "strings/single_quotes"
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
            .map(|(_, change_set)| change_set)
            .collect()
    }
}
