//! Comment blocks.
//!
//! A block is either one comment token or a run of line comments that each sit
//! on their own line, share an indentation and follow each other without blank
//! lines. Its content is kept as bare text lines, stripped of markers, leading
//! stars and the blank lines at either edge, so it can be rendered back in
//! whichever canonical form applies.

use crate::analyzer::classifier::property_variable_after;
use crate::analyzer::directives::is_directive;
use crate::analyzer::parser::ParsedSource;
use crate::analyzer::rules::helpers::line_indent;
use crate::analyzer::tokens::TokenStream;

const DECLARATION_MODIFIERS: &[&str] =
    &["public", "protected", "private", "static", "final", "readonly"];
const DECLARATIONS: &[&str] = &["class", "interface", "trait", "enum", "function", "abstract"];

/// Shape of a single comment token, read from its markers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    LineSlash,
    LineHash,
    InlineBlock,
    MultilineBlock,
    InlineDoc,
    MultilineDoc,
}

impl Shape {
    /// `None` for comments that are never rewritten: empty `/**/` and `/***` banners.
    pub fn classify(text: &str) -> Option<Shape> {
        if text.starts_with("//") {
            return Some(Shape::LineSlash);
        }
        if text.starts_with('#') {
            return Some(Shape::LineHash);
        }
        if !text.starts_with("/*") || !text.ends_with("*/") || text.len() < 4 {
            return None;
        }

        let multiline = text.contains('\n');
        if text.starts_with("/***") || text == "/**/" {
            return None;
        }
        let shape = match (text.starts_with("/**"), multiline) {
            (true, false) => Shape::InlineDoc,
            (true, true) => Shape::MultilineDoc,
            (false, false) => Shape::InlineBlock,
            (false, true) => Shape::MultilineBlock,
        };
        Some(shape)
    }

    pub fn is_line(self) -> bool {
        matches!(self, Shape::LineSlash | Shape::LineHash)
    }

    pub fn is_doc(self) -> bool {
        matches!(self, Shape::InlineDoc | Shape::MultilineDoc)
    }

    pub fn is_multiline(self) -> bool {
        matches!(self, Shape::MultilineBlock | Shape::MultilineDoc)
    }

    /// Content lines of a comment of this shape, markers removed.
    pub fn content_lines(self, text: &str) -> Vec<String> {
        match self {
            Shape::LineSlash => vec![text[2..].trim().to_string()],
            Shape::LineHash => vec![text[1..].trim().to_string()],
            Shape::InlineDoc | Shape::MultilineDoc => block_lines(&text[3..text.len() - 2]),
            Shape::InlineBlock | Shape::MultilineBlock => block_lines(&text[2..text.len() - 2]),
        }
    }
}

/// Lines of a block comment body. Interior lines lose one leading `*` and the
/// single space after it, so indentation written past the star survives.
fn block_lines(body: &str) -> Vec<String> {
    body.split('\n')
        .enumerate()
        .map(|(idx, raw)| {
            let raw = raw.trim_end();
            if idx == 0 {
                return raw.trim_start().to_string();
            }
            let trimmed = raw.trim_start();
            match trimmed.strip_prefix('*') {
                Some(rest) => rest.strip_prefix(' ').unwrap_or(rest).to_string(),
                None => trimmed.to_string(),
            }
        })
        .collect()
}

fn strip_blank_edges(lines: &mut Vec<String>) {
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|line| line.is_empty()).count();
    lines.drain(..leading);
}

/// Canonical written form of a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Form {
    /// `// text`
    Line,
    /// `/** text */`
    InlineDoc,
    /// `/*` or `/**`, one ` * text` line per content line, then ` */`.
    Block { doc: bool },
}

impl Form {
    pub fn is_doc(self) -> bool {
        matches!(self, Form::InlineDoc | Form::Block { doc: true })
    }

    pub fn is_single_line(self) -> bool {
        !matches!(self, Form::Block { .. })
    }
}

/// Renders `lines` in `form`. Interior and closing lines are indented with
/// `indent`; the opener takes the place of the original first token.
pub fn render(lines: &[String], form: Form, indent: &str, newline: &str) -> String {
    match form {
        Form::Line => format!("// {}", lines.join(" ")),
        Form::InlineDoc => format!("/** {} */", lines.join(" ")),
        Form::Block { doc } => {
            let mut out = String::from(if doc { "/**" } else { "/*" });
            for line in lines {
                out.push_str(newline);
                out.push_str(indent);
                if line.is_empty() {
                    out.push_str(" *");
                } else {
                    out.push_str(" * ");
                    out.push_str(line);
                }
            }
            out.push_str(newline);
            out.push_str(indent);
            out.push_str(" */");
            out
        }
    }
}

/// `true` when the code after `last` is a class-like or function declaration,
/// possibly behind attributes and modifiers.
pub fn precedes_declaration(tokens: &TokenStream, last: usize) -> bool {
    let mut cursor = last + 1;
    while let Some(token) = tokens.get(cursor) {
        if token.is_whitespace() || token.is_any_keyword(DECLARATION_MODIFIERS) {
            cursor += 1;
            continue;
        }
        if token.is_punct("#[") {
            match token.matching {
                Some(close) => {
                    cursor = close + 1;
                    continue;
                }
                None => return false,
            }
        }
        return token.is_any_keyword(DECLARATIONS);
    }
    false
}

/// A comment, or a group of line comments, eligible for reformatting.
#[derive(Clone, Debug)]
pub struct CommentBlock {
    pub first: usize,
    pub last: usize,
    pub shape: Shape,
    pub members: usize,
    pub indent: String,
    pub owns_line: bool,
    pub lines: Vec<String>,
    pub has_annotation: bool,
    pub precedes_declaration: bool,
    /// Variable of the property declared right after the block.
    pub property: Option<usize>,
}

impl CommentBlock {
    /// Every block of the file, in source order.
    pub fn collect(parsed: &ParsedSource) -> Vec<CommentBlock> {
        let mut blocks = Vec::new();
        let mut idx = 0;
        while idx < parsed.tokens.len() {
            match Self::starting_at(parsed, idx) {
                Some(block) => {
                    idx = block.last + 1;
                    blocks.push(block);
                }
                None => idx += 1,
            }
        }
        blocks
    }

    fn starting_at(parsed: &ParsedSource, idx: usize) -> Option<CommentBlock> {
        let tokens = &parsed.tokens;
        if !is_candidate(tokens, idx) {
            return None;
        }
        let shape = Shape::classify(&tokens[idx].text)?;
        let indent = line_indent(parsed, idx);
        let owns_line = indent.is_some();
        let indent = indent.unwrap_or_default().to_string();

        let mut lines = shape.content_lines(&tokens[idx].text);
        let mut last = idx;
        let mut members = 1;
        if shape.is_line() && owns_line {
            while let Some((next, next_shape)) = next_group_member(tokens, last, &indent) {
                lines.extend(next_shape.content_lines(&tokens[next].text));
                last = next;
                members += 1;
            }
        }

        strip_blank_edges(&mut lines);
        if lines.is_empty() {
            return None;
        }

        Some(CommentBlock {
            first: idx,
            last,
            shape,
            members,
            has_annotation: lines.iter().any(|line| line.contains('@')),
            precedes_declaration: owns_line && precedes_declaration(tokens, last),
            property: property_variable_after(tokens, last),
            indent,
            owns_line,
            lines,
        })
    }

    pub fn is_group(&self) -> bool {
        self.members > 1
    }
}

/// Comments that end their line and carry neither a directive nor a close tag.
fn is_candidate(tokens: &TokenStream, idx: usize) -> bool {
    let token = &tokens[idx];
    token.is_comment()
        && !token.text.contains("?>")
        && !is_directive(&token.text)
        && ends_line(tokens, idx)
}

fn ends_line(tokens: &TokenStream, idx: usize) -> bool {
    match tokens.get(idx + 1) {
        None => true,
        Some(next) if next.is_whitespace() => {
            next.contains_newline() || tokens.get(idx + 2).is_none()
        }
        Some(_) => false,
    }
}

/// Line comment on the next line at the same indentation, if there is one.
fn next_group_member(tokens: &TokenStream, idx: usize, indent: &str) -> Option<(usize, Shape)> {
    let gap = tokens.get(idx + 1).filter(|token| token.is_whitespace())?;
    let newline = gap.text.find('\n')?;
    if gap.text[newline + 1..].contains('\n') || !gap.text[..newline].trim().is_empty() {
        return None;
    }
    if &gap.text[newline + 1..] != indent {
        return None;
    }

    let next = idx + 2;
    if !tokens.get(next).is_some_and(|_| is_candidate(tokens, next)) {
        return None;
    }
    Shape::classify(&tokens[next].text)
        .filter(|shape| shape.is_line())
        .map(|shape| (next, shape))
}
