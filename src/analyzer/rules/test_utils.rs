//! Test utilities for colocated rule tests.
//!
//! Rule tests parse a PHP snippet, run one rule against it and compare the
//! diagnostics (as `{severity}: {message}` lines) or the fixed text.

use std::path::Path;

use crate::analyzer::Diagnostic;
use crate::analyzer::fix;
use crate::analyzer::names::FileContext;
use crate::analyzer::parser::{self, PhpParser, TreeSitterPhpParser};
use crate::analyzer::rules::DiagnosticRule;

/// Parse PHP source code into a `ParsedSource` for testing.
///
/// # Example
/// ```rust,ignore
/// use crate::analyzer::rules::test_utils::parse_php;
///
/// let parsed = parse_php("<?php\nfunction test() {\n    return 42;\n}\n");
/// assert!(!parsed.tokens.is_empty());
/// ```
pub fn parse_php(source: &str) -> parser::ParsedSource {
    parse_php_with_path(source, "test.php")
}

/// Parse PHP source code with a custom file path.
pub fn parse_php_with_path(source: &str, path: &str) -> parser::ParsedSource {
    TreeSitterPhpParser::new()
        .expect("failed to load tree-sitter-php language")
        .parse_source(Path::new(path), source.to_string())
        .expect("failed to parse PHP source")
}

/// Run a rule on parsed PHP code and return the diagnostics.
///
/// # Example
/// ```rust,ignore
/// use crate::analyzer::rules::test_utils::{parse_php, run_rule};
/// use crate::analyzer::rules::functions::ForbiddenVariadicRule;
///
/// let parsed = parse_php("<?php\nfunction f(int ...$rest) {}\n");
/// let diagnostics = run_rule(&ForbiddenVariadicRule::new(), &parsed);
/// assert_eq!(diagnostics.len(), 1);
/// ```
pub fn run_rule<R>(rule: &R, parsed: &parser::ParsedSource) -> Vec<Diagnostic>
where
    R: DiagnosticRule,
{
    let context = FileContext::from_tokens(&parsed.tokens);
    rule.run(parsed, &context)
}

/// Run a rule's fix function and return the proposed change-sets.
pub fn run_fix<R>(rule: &R, parsed: &parser::ParsedSource) -> Vec<fix::ChangeSet>
where
    R: DiagnosticRule,
{
    let context = FileContext::from_tokens(&parsed.tokens);
    rule.fix(parsed, &context)
}

/// Assert that no diagnostics were produced.
pub fn assert_no_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }

    let mut error_msg = String::from("\nExpected no diagnostics, but got:\n");
    for (i, diag) in diagnostics.iter().enumerate() {
        error_msg.push_str(&format!(
            "  {}. line {}: {}: {} [{}]\n",
            i + 1,
            diag.line(),
            diag.severity,
            diag.message,
            diag.code
        ));
    }
    panic!("{error_msg}");
}

/// Assert that diagnostics match `{severity}: {message}` lines exactly and in order.
pub fn assert_diagnostics_exact(diagnostics: &[Diagnostic], expected_lines: &[&str]) {
    let actual_lines: Vec<String> = diagnostics
        .iter()
        .map(|d| format!("{}: {}", d.severity, d.message))
        .collect();

    if actual_lines != expected_lines {
        let mut error_msg = String::from("\nDiagnostic mismatch\n\nExpected diagnostics:\n");
        for (i, line) in expected_lines.iter().enumerate() {
            error_msg.push_str(&format!("  {}. {}\n", i + 1, line));
        }
        error_msg.push_str("\nActual diagnostics:\n");
        for (i, line) in actual_lines.iter().enumerate() {
            error_msg.push_str(&format!("  {}. {}\n", i + 1, line));
        }
        panic!("{error_msg}");
    }
}

/// Assert that the diagnostics carry `codes`, in order.
pub fn assert_codes(diagnostics: &[Diagnostic], codes: &[&str]) {
    let actual: Vec<&str> = diagnostics.iter().map(|d| d.code.as_str()).collect();
    assert_eq!(actual, codes, "diagnostic codes did not match");
}

/// Apply a single pass of a rule's change-sets and return the text.
pub fn fix_once<R>(rule: &R, input: &str) -> String
where
    R: DiagnosticRule,
{
    let parsed = parse_php(input);
    let change_sets = run_fix(rule, &parsed);
    fix::apply_change_sets(input, &change_sets).text
}

/// Assert that a rule's fix produces the expected output when applied to input source.
pub fn assert_fix<R>(rule: &R, input: &str, expected: &str)
where
    R: DiagnosticRule,
{
    let actual = fix_once(rule, input);

    if actual != expected {
        let mut error_msg = String::from("\nFix output mismatch\n");
        error_msg.push_str(&format!("\nExpected output:\n```php\n{expected}\n```\n"));
        error_msg.push_str(&format!("\nActual output:\n```php\n{actual}\n```\n"));

        error_msg.push_str("\nDifferences:\n");
        let expected_lines: Vec<&str> = expected.lines().collect();
        let actual_lines: Vec<&str> = actual.lines().collect();
        for i in 0..expected_lines.len().max(actual_lines.len()) {
            let expected_line = expected_lines.get(i).copied().unwrap_or("");
            let actual_line = actual_lines.get(i).copied().unwrap_or("");
            if expected_line != actual_line {
                error_msg.push_str(&format!("  Line {}:\n", i + 1));
                error_msg.push_str(&format!("    - {expected_line}\n"));
                error_msg.push_str(&format!("    + {actual_line}\n"));
            }
        }

        panic!("{error_msg}");
    }
}

/// Assert that the rule reports nothing and proposes nothing on `source`.
pub fn assert_idempotent<R>(rule: &R, source: &str)
where
    R: DiagnosticRule,
{
    let parsed = parse_php(source);
    assert_no_diagnostics(&run_rule(rule, &parsed));
    assert!(
        run_fix(rule, &parsed).is_empty(),
        "expected no change-sets for already fixed source:\n{source}"
    );
}
