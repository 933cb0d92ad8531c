use std::cmp::Ordering;

use tracing::debug;

use super::tokens::TokenStream;

/// Represents a single byte-range edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

impl TextEdit {
    pub fn new(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
            replacement: replacement.into(),
        }
    }

    fn overlaps(&self, other: &TextEdit) -> bool {
        self.start == other.start || (self.start < other.end && other.start < self.end)
    }
}

/// A group of edits proposed together by one rule for one finding.
///
/// Change-sets are applied all-or-nothing: if any edit collides with an edit of
/// an already accepted change-set, the whole set is rejected for this pass.
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    code: String,
    line: usize,
    edits: Vec<TextEdit>,
}

impl ChangeSet {
    /// Starts a change-set for diagnostic `code`, anchored at the line of token `anchor`.
    pub fn new(code: impl Into<String>, tokens: &TokenStream, anchor: usize) -> Self {
        Self {
            code: code.into(),
            line: tokens.get(anchor).map_or(0, |token| token.line()),
            edits: Vec::new(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn edits(&self) -> &[TextEdit] {
        &self.edits
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn replace_token(&mut self, tokens: &TokenStream, idx: usize, text: impl Into<String>) {
        let token = &tokens[idx];
        self.edits.push(TextEdit::new(token.start, token.end, text));
    }

    /// Replaces tokens `first..=last` with `text`.
    pub fn replace_tokens(
        &mut self,
        tokens: &TokenStream,
        first: usize,
        last: usize,
        text: impl Into<String>,
    ) {
        self.edits
            .push(TextEdit::new(tokens[first].start, tokens[last].end, text));
    }

    pub fn add_content_before(&mut self, tokens: &TokenStream, idx: usize, text: impl Into<String>) {
        let start = tokens[idx].start;
        self.edits.push(TextEdit::new(start, start, text));
    }

    /// Removes token `idx` together with the whitespace token right after it.
    pub fn remove_with_trailing_whitespace(&mut self, tokens: &TokenStream, idx: usize) {
        let end = match tokens.get(idx + 1) {
            Some(next) if next.is_whitespace() && !next.contains_newline() => next.end,
            _ => tokens[idx].end,
        };
        self.edits.push(TextEdit::new(tokens[idx].start, end, ""));
    }

    fn sorted_edits(&self) -> Vec<TextEdit> {
        let mut sorted = self.edits.clone();
        sorted.sort_by(|a, b| match a.start.cmp(&b.start) {
            Ordering::Equal => a.end.cmp(&b.end),
            ordering => ordering,
        });
        sorted
    }

    fn is_consistent(sorted: &[TextEdit]) -> bool {
        sorted.windows(2).all(|pair| pair[0].end <= pair[1].start)
    }
}

/// Result of applying change-sets to a source text.
#[derive(Debug, Clone)]
pub struct FixOutcome {
    pub text: String,
    pub applied: usize,
    pub rejected: usize,
}

/// Applies change-sets in order, skipping any set that collides with one already accepted.
pub fn apply_change_sets(source: &str, change_sets: &[ChangeSet]) -> FixOutcome {
    let mut accepted: Vec<TextEdit> = Vec::new();
    let mut applied = 0;
    let mut rejected = 0;

    for change_set in change_sets.iter().filter(|set| !set.is_empty()) {
        let sorted = change_set.sorted_edits();
        let out_of_bounds = sorted.iter().any(|edit| {
            edit.end > source.len()
                || !source.is_char_boundary(edit.start)
                || !source.is_char_boundary(edit.end)
        });
        let collides = sorted
            .iter()
            .any(|edit| accepted.iter().any(|existing| existing.overlaps(edit)));

        if out_of_bounds || collides || !ChangeSet::is_consistent(&sorted) {
            debug!(
                code = change_set.code(),
                line = change_set.line(),
                "rejected overlapping change-set"
            );
            rejected += 1;
            continue;
        }

        accepted.extend(sorted);
        applied += 1;
    }

    FixOutcome {
        text: apply_text_edits(source, &accepted),
        applied,
        rejected,
    }
}

/// Applies a sequence of non-overlapping edits to `source` and returns the updated text.
///
/// Edits that start before the end of a previously applied edit are dropped.
pub fn apply_text_edits(source: &str, edits: &[TextEdit]) -> String {
    let mut sorted = edits.to_vec();
    sorted.sort_by(|a, b| match a.start.cmp(&b.start) {
        Ordering::Equal => a.end.cmp(&b.end),
        ordering => ordering,
    });

    let mut result = String::with_capacity(source.len());
    let mut cursor = 0;
    for edit in sorted {
        if cursor > edit.start || edit.end > source.len() {
            continue;
        }

        result.push_str(&source[cursor..edit.start]);
        result.push_str(&edit.replacement);
        cursor = edit.end;
    }

    result.push_str(&source[cursor..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(edits: &[(usize, usize, &str)]) -> ChangeSet {
        ChangeSet {
            code: "test/edit".to_string(),
            line: 1,
            edits: edits
                .iter()
                .map(|(start, end, text)| TextEdit::new(*start, *end, *text))
                .collect(),
        }
    }

    #[test]
    fn applies_disjoint_change_sets() {
        let source = "alpha beta gamma";
        let outcome = apply_change_sets(
            source,
            &[set(&[(0, 5, "ALPHA")]), set(&[(11, 16, "GAMMA")])],
        );

        assert_eq!(outcome.text, "ALPHA beta GAMMA");
        assert_eq!(outcome.applied, 2);
        assert_eq!(outcome.rejected, 0);
    }

    #[test]
    fn rejects_whole_change_set_on_overlap() {
        let source = "alpha beta gamma";
        let outcome = apply_change_sets(
            source,
            &[
                set(&[(6, 10, "BETA")]),
                set(&[(0, 5, "A"), (8, 12, "X")]),
            ],
        );

        assert_eq!(outcome.text, "alpha BETA gamma");
        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.rejected, 1);
    }

    #[test]
    fn insertion_and_replacement_in_one_change_set() {
        let source = "final class Box";
        let outcome = apply_change_sets(source, &[set(&[(6, 6, "readonly "), (0, 5, "FINAL")])]);
        assert_eq!(outcome.text, "FINAL readonly class Box");
    }

    #[test]
    fn text_edits_skip_overlaps_instead_of_panicking() {
        let source = "0123456789";
        let edits = vec![TextEdit::new(2, 5, "x"), TextEdit::new(4, 6, "y")];
        assert_eq!(apply_text_edits(source, &edits), "01x56789");
    }
}
