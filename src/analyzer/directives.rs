//! In-source directives that control which rules run and which diagnostics are kept.
//!
//! ```php
//! // php-sniffs-ignore-file: strings
//! // php-sniffs-ignore: classes/forbidden_public_property
//! // php-sniffs-only: comments/format
//! // php-sniffs-skip: naming/camel_case_variable
//! ```
//!
//! `ignore` applies to the comment's own line and the line after it. Codes match
//! exactly or as a `/`-separated prefix, so `classes` covers every classes rule.

use std::sync::LazyLock;

use regex::Regex;

use super::tokens::TokenStream;

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)php-sniffs-(ignore-file|ignore|only|skip)\b(?:\s*:([^*\r\n]*))?")
        .expect("valid directive pattern")
});

/// `true` when a comment carries a directive.
pub fn is_directive(comment: &str) -> bool {
    DIRECTIVE.is_match(comment)
}

#[derive(Clone, Debug, Default)]
struct Suppression {
    all: bool,
    patterns: Vec<String>,
}

impl Suppression {
    fn add(&mut self, args: &[String]) {
        if args.is_empty() || args.iter().any(|arg| ["*", "all"].contains(&arg.as_str())) {
            self.all = true;
        } else {
            self.patterns.extend(args.iter().cloned());
        }
    }

    fn matches(&self, code: &str) -> bool {
        self.all || self.patterns.iter().any(|pattern| code_matches(pattern, code))
    }

    fn is_empty(&self) -> bool {
        !self.all && self.patterns.is_empty()
    }
}

/// Directives collected from the comments of one file.
#[derive(Clone, Debug, Default)]
pub struct Directives {
    file: Suppression,
    lines: Vec<(usize, Suppression)>,
    only: Option<Vec<String>>,
    skip: Vec<String>,
}

impl Directives {
    pub fn from_tokens(tokens: &TokenStream) -> Self {
        let mut directives = Self::default();

        for (_, token) in tokens.iter().filter(|(_, token)| token.is_comment()) {
            for captures in DIRECTIVE.captures_iter(&token.text) {
                let args = captures
                    .get(2)
                    .map(|args| split_args(args.as_str()))
                    .unwrap_or_default();
                let kind = captures[1].to_ascii_lowercase();
                // the last line of a block comment is the one the next line follows
                let line = token.end_point.row + 1;

                match kind.as_str() {
                    "ignore-file" => directives.file.add(&args),
                    "ignore" => {
                        let mut suppression = Suppression::default();
                        suppression.add(&args);
                        directives.lines.push((line, suppression));
                    }
                    "only" if !args.is_empty() => {
                        directives.only.get_or_insert_with(Vec::new).extend(args);
                    }
                    "skip" => directives.skip.extend(args),
                    _ => {}
                }
            }
        }

        directives
    }

    /// Returns `false` when an `only`/`skip` directive excludes `rule_name`.
    pub fn should_run_rule(&self, rule_name: &str) -> bool {
        if self.skip.iter().any(|pattern| code_matches(pattern, rule_name)) {
            return false;
        }

        match &self.only {
            Some(only) => only.iter().any(|pattern| code_matches(pattern, rule_name)),
            None => true,
        }
    }

    /// Returns `true` when a diagnostic with `code` reported on `line` is suppressed.
    pub fn suppresses(&self, code: &str, line: usize) -> bool {
        if self.file.matches(code) {
            return true;
        }

        self.lines.iter().any(|(directive_line, suppression)| {
            (line == *directive_line || line == directive_line + 1) && suppression.matches(code)
        })
    }

    /// `true` when the whole file is excluded from analysis.
    pub fn ignores_everything(&self) -> bool {
        self.file.all
    }

    pub fn is_empty(&self) -> bool {
        self.file.is_empty() && self.lines.is_empty() && self.only.is_none() && self.skip.is_empty()
    }
}

fn split_args(args: &str) -> Vec<String> {
    args.split(|c: char| c == ',' || c.is_whitespace())
        .map(|arg| arg.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`'))
        .map(|arg| arg.trim_end_matches('/'))
        .filter(|arg| !arg.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

fn code_matches(pattern: &str, code: &str) -> bool {
    let code = code.to_ascii_lowercase();
    code == pattern
        || (code.starts_with(pattern) && code.as_bytes().get(pattern.len()) == Some(&b'/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::rules::test_utils::parse_php;

    fn directives(source: &str) -> Directives {
        Directives::from_tokens(&parse_php(source).tokens)
    }

    #[test]
    fn file_directive_with_codes_suppresses_by_prefix() {
        let directives = directives("<?php\n// php-sniffs-ignore-file: strings, naming/camel_case_variable\n$a = 1;\n");
        assert!(directives.suppresses("strings/single_quotes", 10));
        assert!(directives.suppresses("naming/camel_case_variable", 3));
        assert!(!directives.suppresses("classes/readonly_class", 3));
        assert!(!directives.ignores_everything());
    }

    #[test]
    fn bare_file_directive_ignores_everything() {
        let directives = directives("<?php\n# php-sniffs-ignore-file\n");
        assert!(directives.ignores_everything());
    }

    #[test]
    fn line_directive_covers_its_line_and_the_next() {
        let source = "<?php\n// php-sniffs-ignore: classes\nclass A {}\nclass B {}\n";
        let directives = directives(source);
        assert!(directives.suppresses("classes/readonly_property", 2));
        assert!(directives.suppresses("classes/readonly_property", 3));
        assert!(!directives.suppresses("classes/readonly_property", 4));
        assert!(!directives.suppresses("strings/single_quotes", 3));
    }

    #[test]
    fn only_and_skip_select_rules() {
        let directives = directives(
            "<?php\n// php-sniffs-only: comments/format, classes\n// php-sniffs-skip: classes/readonly_class\n",
        );
        assert!(directives.should_run_rule("comments/format"));
        assert!(directives.should_run_rule("classes/readonly_property"));
        assert!(!directives.should_run_rule("classes/readonly_class"));
        assert!(!directives.should_run_rule("strings/single_quotes"));
    }

    #[test]
    fn files_without_directives_run_everything() {
        let directives = directives("<?php\n// plain comment\n$a = 1;\n");
        assert!(directives.is_empty());
        assert!(directives.should_run_rule("strings/single_quotes"));
        assert!(!directives.suppresses("strings/single_quotes", 2));
    }
}
