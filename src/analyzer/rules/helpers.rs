use crate::analyzer::parser;
use crate::analyzer::{Diagnostic, Severity, Span};

/// Diagnostic spanning the token at `idx`.
pub fn diagnostic_for_token(
    parsed: &parser::ParsedSource,
    idx: usize,
    severity: Severity,
    code: impl Into<String>,
    message: impl Into<String>,
) -> Diagnostic {
    diagnostic_for_tokens(parsed, idx, idx, severity, code, message)
}

/// Diagnostic spanning tokens `first..=last`.
pub fn diagnostic_for_tokens(
    parsed: &parser::ParsedSource,
    first: usize,
    last: usize,
    severity: Severity,
    code: impl Into<String>,
    message: impl Into<String>,
) -> Diagnostic {
    let tokens = &parsed.tokens;
    let span = Span {
        start: tokens[first].start_point,
        end: tokens[last].end_point,
    };
    let snippet_line = line_at(&parsed.source, span.start.row);

    Diagnostic::new(
        parsed.path.clone(),
        severity,
        code,
        message,
        span,
        snippet_line,
    )
}

pub fn line_at(source: &str, row: usize) -> Option<String> {
    source
        .lines()
        .nth(row)
        .map(|line| line.trim_end_matches('\r').to_owned())
}

/// Whitespace between the start of the line and token `idx`, if only whitespace precedes it.
pub fn line_indent(parsed: &parser::ParsedSource, idx: usize) -> Option<&str> {
    let start = parsed.tokens[idx].start;
    let line_start = parsed.source[..start].rfind('\n').map_or(0, |pos| pos + 1);
    let prefix = &parsed.source[line_start..start];
    prefix
        .chars()
        .all(|c| c == ' ' || c == '\t')
        .then_some(prefix)
}
