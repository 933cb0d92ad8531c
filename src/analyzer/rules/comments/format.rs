use super::DiagnosticRule;
use super::block::{CommentBlock, Form, Shape, render};
use super::helpers::diagnostic_for_tokens;
use crate::analyzer::fix::ChangeSet;
use crate::analyzer::names::FileContext;
use crate::analyzer::{Diagnostic, Severity, parser};

const RULE: &str = "comments/format";

/// First thing wrong with a comment, in reporting order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Issue {
    Merge,
    Hash,
    Doc,
    Plain,
    SingleLine,
    RedundantVar,
    Spacing,
    Layout,
}

impl Issue {
    fn code(self) -> String {
        let detail = match self {
            Issue::Merge => "merge",
            Issue::Hash => "hash",
            Issue::Doc => "doc",
            Issue::Plain => "plain",
            Issue::SingleLine => "single_line",
            Issue::RedundantVar => "redundant_var",
            Issue::Spacing => "spacing",
            Issue::Layout => "layout",
        };
        format!("{RULE}/{detail}")
    }

    fn message(self) -> &'static str {
        match self {
            Issue::Merge => "Consecutive line comments must be merged into one block comment",
            Issue::Hash => "Hash comments must be written with //",
            Issue::Doc => "Comment with annotations or before a declaration must be a doc comment",
            Issue::Plain => "Doc comment without annotations must be a plain comment",
            Issue::SingleLine => "Comment with a single line of content must be written on one line",
            Issue::RedundantVar => "@var annotation repeats the property name",
            Issue::Spacing => "Line comment must have exactly one space after //",
            Issue::Layout => "Block comment layout is not canonical",
        }
    }
}

/// Rewrites every comment that ends its line into one canonical shape.
pub struct CommentFormatRule;

impl CommentFormatRule {
    pub fn new() -> Self {
        Self
    }

    fn findings(&self, parsed: &parser::ParsedSource) -> Vec<(Diagnostic, ChangeSet)> {
        let tokens = &parsed.tokens;
        let mut findings = Vec::new();

        for mut block in CommentBlock::collect(parsed) {
            let Some(form) = canonical_form(&block) else {
                continue;
            };

            let mut stripped_var = false;
            if form.is_doc() {
                if let Some(variable) = block.property {
                    stripped_var = strip_redundant_var(&mut block.lines, &tokens[variable].text);
                }
            }

            // `*/` inside a line comment would close the block it is merged into
            let breaks_block = !matches!(form, Form::Line)
                && block.shape.is_line()
                && block.lines.iter().any(|line| line.contains("*/"));
            if breaks_block {
                continue;
            }

            let canonical = render(&block.lines, form, &block.indent, parsed.newline());
            let original = &parsed.source[tokens[block.first].start..tokens[block.last].end];
            if canonical == original {
                continue;
            }

            let issue = detect_issue(&block, form, stripped_var);
            let code = issue.code();
            let diagnostic = diagnostic_for_tokens(
                parsed,
                block.first,
                block.last,
                Severity::Error,
                code.clone(),
                issue.message(),
            )
            .fixable();
            let mut change_set = ChangeSet::new(code, tokens, block.first);
            change_set.replace_tokens(tokens, block.first, block.last, canonical);
            findings.push((diagnostic, change_set));
        }

        findings
    }
}

/// Form a block should be written in, or `None` when it cannot be rewritten in place.
fn canonical_form(block: &CommentBlock) -> Option<Form> {
    // A merged group without tags stays a plain block: rendered as a doc block it
    // would no longer be a line group on the next pass and would be downgraded.
    let doc = if block.shape.is_line() && !block.is_group() {
        block.precedes_declaration
    } else {
        block.has_annotation || block.precedes_declaration
    };

    if block.lines.len() == 1 {
        return Some(if block.precedes_declaration {
            Form::Block { doc: true }
        } else if doc {
            Form::InlineDoc
        } else {
            Form::Line
        });
    }

    // code before the comment leaves no room for the lines of a block
    block.owns_line.then_some(Form::Block { doc })
}

fn detect_issue(block: &CommentBlock, form: Form, stripped_var: bool) -> Issue {
    if block.is_group() {
        Issue::Merge
    } else if block.shape == Shape::LineHash {
        Issue::Hash
    } else if form.is_doc() && !block.shape.is_doc() {
        Issue::Doc
    } else if !form.is_doc() && block.shape.is_doc() {
        Issue::Plain
    } else if form.is_single_line() && block.shape.is_multiline() {
        Issue::SingleLine
    } else if stripped_var {
        Issue::RedundantVar
    } else if block.shape == Shape::LineSlash {
        Issue::Spacing
    } else {
        Issue::Layout
    }
}

/// Drops `variable` from `@var` lines that also name a type.
fn strip_redundant_var(lines: &mut [String], variable: &str) -> bool {
    let mut changed = false;
    for line in lines.iter_mut() {
        let Some(rest) = line.strip_prefix("@var") else {
            continue;
        };
        if !rest.starts_with(char::is_whitespace) {
            continue;
        }
        let words: Vec<&str> = rest.split_whitespace().collect();
        if words.len() < 2 || !words.contains(&variable) {
            continue;
        }
        let kept: Vec<&str> = words.into_iter().filter(|word| *word != variable).collect();
        *line = format!("@var {}", kept.join(" "));
        changed = true;
    }
    changed
}

impl DiagnosticRule for CommentFormatRule {
    fn name(&self) -> &str {
        RULE
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
