//! Token stream built from the leaves of a tree-sitter parse.
//!
//! Every byte of the source belongs to exactly one token: parser leaves become
//! tokens and the gaps between them become whitespace tokens. Structural links
//! (matching brackets, scope owners) are computed once after tokenizing.

use std::ops::Index;

use tree_sitter::{Node, Point, Tree};

/// Node kinds that are kept as a single token instead of being split into leaves.
const ATOMIC_KINDS: &[&str] = &[
    "comment",
    "variable_name",
    "string",
    "encapsed_string",
    "heredoc",
    "nowdoc",
    "shell_command_expression",
    "integer",
    "float",
    "text",
    "php_tag",
    "visibility_modifier",
    "static_modifier",
    "readonly_modifier",
    "final_modifier",
    "abstract_modifier",
    "var_modifier",
    "primitive_type",
    "cast_type",
    "boolean",
    "null",
];

const KEYWORDS: &[&str] = &[
    "abstract",
    "and",
    "as",
    "break",
    "case",
    "catch",
    "class",
    "clone",
    "const",
    "continue",
    "declare",
    "default",
    "do",
    "echo",
    "else",
    "elseif",
    "enddeclare",
    "endfor",
    "endforeach",
    "endif",
    "endswitch",
    "endwhile",
    "enum",
    "extends",
    "final",
    "finally",
    "fn",
    "for",
    "foreach",
    "function",
    "global",
    "goto",
    "if",
    "implements",
    "include",
    "include_once",
    "instanceof",
    "insteadof",
    "interface",
    "match",
    "namespace",
    "new",
    "or",
    "print",
    "private",
    "protected",
    "public",
    "readonly",
    "require",
    "require_once",
    "return",
    "static",
    "switch",
    "throw",
    "trait",
    "try",
    "use",
    "var",
    "while",
    "xor",
    "yield",
];

/// Keywords that stay keywords even when the grammar recovered them as a `name`.
const RESERVED_MODIFIERS: &[&str] = &[
    "abstract",
    "class",
    "final",
    "function",
    "interface",
    "private",
    "protected",
    "public",
    "readonly",
    "static",
    "trait",
    "var",
];

/// Keywords that open a braced scope.
const SCOPE_OWNERS: &[&str] = &[
    "class",
    "interface",
    "trait",
    "enum",
    "function",
    "namespace",
    "if",
    "else",
    "elseif",
    "for",
    "foreach",
    "while",
    "do",
    "switch",
    "try",
    "catch",
    "finally",
    "match",
    "declare",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    OpenTag,
    CloseTag,
    InlineHtml,
    Whitespace,
    Comment,
    Variable,
    Name,
    NsSeparator,
    Keyword,
    ConstantString,
    InterpolatedString,
    Number,
    Punct,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub start_point: Point,
    pub end_point: Point,
    /// Partner of a bracket token: `(`/`)`, `[`/`]`, `{`/`}`, `#[`/`]`.
    pub matching: Option<usize>,
    /// Keyword owning a `{`/`}` pair, set on both braces.
    pub scope_owner: Option<usize>,
    /// `{` opened by an owner keyword, set on the keyword.
    pub scope_opener: Option<usize>,
    /// Innermost `{` enclosing this token.
    pub parent_scope: Option<usize>,
}

impl Token {
    /// 1-based line of the first byte.
    pub fn line(&self) -> usize {
        self.start_point.row + 1
    }

    pub fn is_whitespace(&self) -> bool {
        self.kind == TokenKind::Whitespace
    }

    pub fn is_comment(&self) -> bool {
        self.kind == TokenKind::Comment
    }

    pub fn is_code(&self) -> bool {
        !matches!(self.kind, TokenKind::Whitespace | TokenKind::Comment)
    }

    pub fn is_punct(&self, text: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == text
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text.eq_ignore_ascii_case(word)
    }

    pub fn is_any_keyword(&self, words: &[&str]) -> bool {
        self.kind == TokenKind::Keyword && words.iter().any(|w| self.text.eq_ignore_ascii_case(w))
    }

    pub fn is_name(&self) -> bool {
        self.kind == TokenKind::Name
    }

    pub fn is_variable(&self) -> bool {
        self.kind == TokenKind::Variable
    }

    pub fn is_ns_separator(&self) -> bool {
        self.kind == TokenKind::NsSeparator
    }

    pub fn contains_newline(&self) -> bool {
        self.text.contains('\n')
    }
}

/// Ordered tokens of one source file.
#[derive(Debug, Clone, Default)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

struct Atom {
    start: usize,
    end: usize,
    kind: &'static str,
    named: bool,
}

impl TokenStream {
    pub fn from_tree(tree: &Tree, source: &str) -> Self {
        let mut atoms = Vec::new();
        collect_atoms(tree.root_node(), &mut atoms);

        let lines = LineIndex::new(source);
        let mut builder = Builder {
            source,
            lines: &lines,
            tokens: Vec::new(),
        };

        let mut cursor = 0;
        for atom in atoms {
            if atom.start < cursor || atom.end > source.len() {
                continue;
            }
            if atom.start > cursor {
                builder.push_gap(cursor, atom.start);
            }
            cursor = builder.push_atom(&atom);
        }
        if cursor < source.len() {
            builder.push_gap(cursor, source.len());
        }

        let mut tokens = builder.tokens;
        link_brackets(&mut tokens);
        link_scopes(&mut tokens);
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Token> {
        self.tokens.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Token)> {
        self.tokens.iter().enumerate()
    }

    /// Next token after `idx` that is neither whitespace nor a comment.
    pub fn next_code(&self, idx: usize) -> Option<usize> {
        (idx + 1..self.tokens.len()).find(|&i| self.tokens[i].is_code())
    }

    /// Previous token before `idx` that is neither whitespace nor a comment.
    pub fn prev_code(&self, idx: usize) -> Option<usize> {
        (0..idx.min(self.tokens.len())).rev().find(|&i| self.tokens[i].is_code())
    }

    pub fn next_non_whitespace(&self, idx: usize) -> Option<usize> {
        (idx + 1..self.tokens.len()).find(|&i| !self.tokens[i].is_whitespace())
    }

    pub fn prev_non_whitespace(&self, idx: usize) -> Option<usize> {
        (0..idx.min(self.tokens.len()))
            .rev()
            .find(|&i| !self.tokens[i].is_whitespace())
    }

    /// First index in `from..to` whose token satisfies `predicate`.
    pub fn find_next<F>(&self, from: usize, to: usize, predicate: F) -> Option<usize>
    where
        F: Fn(&Token) -> bool,
    {
        (from..to.min(self.tokens.len())).find(|&i| predicate(&self.tokens[i]))
    }

    pub fn matching(&self, idx: usize) -> Option<usize> {
        self.tokens.get(idx).and_then(|token| token.matching)
    }

    pub fn scope_owner(&self, brace: usize) -> Option<usize> {
        self.tokens.get(brace).and_then(|token| token.scope_owner)
    }

    pub fn scope_opener(&self, owner: usize) -> Option<usize> {
        self.tokens.get(owner).and_then(|token| token.scope_opener)
    }

    /// The unmatched `(` enclosing `idx` within the current statement, if any.
    pub fn enclosing_paren(&self, idx: usize) -> Option<usize> {
        let mut cursor = idx;
        while cursor > 0 {
            cursor -= 1;
            let token = &self.tokens[cursor];
            if token.kind != TokenKind::Punct {
                continue;
            }
            match token.text.as_str() {
                ")" | "]" | "}" => cursor = token.matching?,
                "(" => return Some(cursor),
                "[" | "#[" | "{" | ";" => return None,
                _ => {}
            }
        }
        None
    }

    /// `{` tokens enclosing `idx`, innermost first.
    pub fn enclosing_scopes(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        let first = self.tokens.get(idx).and_then(|token| token.parent_scope);
        std::iter::successors(first, move |&brace| self.tokens[brace].parent_scope)
    }

    /// Innermost enclosing scope whose owner is one of `keywords`, as `(owner, brace)`.
    pub fn enclosing_owner(&self, idx: usize, keywords: &[&str]) -> Option<(usize, usize)> {
        self.enclosing_scopes(idx).find_map(|brace| {
            let owner = self.tokens[brace].scope_owner?;
            self.tokens[owner]
                .is_any_keyword(keywords)
                .then_some((owner, brace))
        })
    }
}

impl Index<usize> for TokenStream {
    type Output = Token;

    fn index(&self, idx: usize) -> &Token {
        &self.tokens[idx]
    }
}

fn collect_atoms(node: Node, atoms: &mut Vec<Atom>) {
    if node.child_count() == 0 || ATOMIC_KINDS.contains(&node.kind()) {
        if node.end_byte() > node.start_byte() {
            atoms.push(Atom {
                start: node.start_byte(),
                end: node.end_byte(),
                kind: node.kind(),
                named: node.is_named(),
            });
        }
        return;
    }

    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            collect_atoms(cursor.node(), atoms);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
}

struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, byte)| *byte == b'\n')
                .map(|(idx, _)| idx + 1),
        );
        Self { starts }
    }

    fn point(&self, byte: usize) -> Point {
        let row = self.starts.partition_point(|&start| start <= byte) - 1;
        Point {
            row,
            column: byte - self.starts[row],
        }
    }
}

struct Builder<'a> {
    source: &'a str,
    lines: &'a LineIndex,
    tokens: Vec<Token>,
}

impl Builder<'_> {
    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            text: self.source[start..end].to_owned(),
            start,
            end,
            start_point: self.lines.point(start),
            end_point: self.lines.point(end),
            matching: None,
            scope_owner: None,
            scope_opener: None,
            parent_scope: None,
        });
    }

    fn push_gap(&mut self, start: usize, end: usize) {
        let text = &self.source[start..end];
        let kind = if text.trim().is_empty() {
            TokenKind::Whitespace
        } else {
            TokenKind::Punct
        };
        self.push(kind, start, end);
    }

    /// Pushes the token(s) for `atom` and returns the byte offset consumed.
    fn push_atom(&mut self, atom: &Atom) -> usize {
        let text = &self.source[atom.start..atom.end];

        match atom.kind {
            "comment" => {
                let trimmed = text.trim_end_matches(['\r', '\n']);
                let end = atom.start + trimmed.len();
                self.push(TokenKind::Comment, atom.start, end);
                return end;
            }
            "text" => {
                self.push(TokenKind::InlineHtml, atom.start, atom.end);
                return atom.end;
            }
            "php_tag" => {
                self.push(TokenKind::OpenTag, atom.start, atom.end);
                return atom.end;
            }
            _ => {}
        }

        if text.len() > 1 && text.contains('\\') && text.chars().all(|c| c == '\\' || is_word_char(c))
        {
            self.push_qualified_name(atom.start, text);
            return atom.end;
        }

        let kind = self.classify(atom, text);
        self.push(kind, atom.start, atom.end);
        atom.end
    }

    fn push_qualified_name(&mut self, start: usize, text: &str) {
        let mut offset = start;
        for (idx, segment) in text.split('\\').enumerate() {
            if idx > 0 {
                self.push(TokenKind::NsSeparator, offset, offset + 1);
                offset += 1;
            }
            if !segment.is_empty() {
                self.push(TokenKind::Name, offset, offset + segment.len());
                offset += segment.len();
            }
        }
    }

    fn classify(&self, atom: &Atom, text: &str) -> TokenKind {
        if text == "\\" {
            return TokenKind::NsSeparator;
        }
        if text == "?>" {
            return TokenKind::CloseTag;
        }
        if let Some(rest) = text.strip_prefix('$') {
            if is_word(rest) {
                return TokenKind::Variable;
            }
        }

        let unprefixed = text.strip_prefix(['b', 'B']).unwrap_or(text);
        if unprefixed.starts_with('\'') || unprefixed.starts_with("<<<'") {
            return TokenKind::ConstantString;
        }
        if unprefixed.starts_with('"') || unprefixed.starts_with("<<<") || text.starts_with('`') {
            return TokenKind::InterpolatedString;
        }
        if text.starts_with(|c: char| c.is_ascii_digit()) {
            return TokenKind::Number;
        }

        if is_word(text) {
            let lower = text.to_ascii_lowercase();
            let is_name_node = atom.named && atom.kind == "name";
            if !is_name_node && KEYWORDS.contains(&lower.as_str()) {
                return TokenKind::Keyword;
            }
            if is_name_node && RESERVED_MODIFIERS.contains(&lower.as_str()) && !self.after_member_access() {
                return TokenKind::Keyword;
            }
            return TokenKind::Name;
        }

        TokenKind::Punct
    }

    fn after_member_access(&self) -> bool {
        self.tokens
            .iter()
            .rev()
            .find(|token| token.is_code())
            .is_some_and(|token| {
                matches!(token.text.as_str(), "->" | "?->" | "::")
                    || token.is_any_keyword(&["function", "const"])
            })
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || !c.is_ascii()
}

fn is_word(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || !c.is_ascii())
        && chars.all(is_word_char)
}

fn link_brackets(tokens: &mut [Token]) {
    let mut stack: Vec<usize> = Vec::new();

    for idx in 0..tokens.len() {
        if tokens[idx].kind != TokenKind::Punct {
            continue;
        }

        let opener = match tokens[idx].text.as_str() {
            "(" | "[" | "{" | "#[" => {
                stack.push(idx);
                continue;
            }
            ")" => "(",
            "]" => "[",
            "}" => "{",
            _ => continue,
        };

        let Some(&open) = stack.last() else {
            continue;
        };
        let open_text = tokens[open].text.as_str();
        let matches = open_text == opener || (opener == "[" && open_text == "#[");
        if matches {
            stack.pop();
            tokens[open].matching = Some(idx);
            tokens[idx].matching = Some(open);
        }
    }
}

fn link_scopes(tokens: &mut [Token]) {
    let mut stack: Vec<usize> = Vec::new();

    for idx in 0..tokens.len() {
        if tokens[idx].is_punct("}") {
            if let Some(open) = tokens[idx].matching {
                if stack.last() == Some(&open) {
                    stack.pop();
                }
                tokens[idx].scope_owner = tokens[open].scope_owner;
            }
        }

        tokens[idx].parent_scope = stack.last().copied();

        if tokens[idx].is_punct("{") && tokens[idx].matching.is_some() {
            if let Some(owner) = find_scope_owner(tokens, idx) {
                tokens[idx].scope_owner = Some(owner);
                if tokens[owner].scope_opener.is_none() {
                    tokens[owner].scope_opener = Some(idx);
                }
            }
            stack.push(idx);
        }
    }
}

fn find_scope_owner(tokens: &[Token], brace: usize) -> Option<usize> {
    let mut cursor = brace;
    while cursor > 0 {
        cursor -= 1;
        let token = &tokens[cursor];
        match token.kind {
            TokenKind::Whitespace | TokenKind::Comment => continue,
            TokenKind::OpenTag | TokenKind::CloseTag | TokenKind::InlineHtml => return None,
            TokenKind::Keyword => {
                if token.is_any_keyword(SCOPE_OWNERS) {
                    return Some(cursor);
                }
            }
            TokenKind::Punct => match token.text.as_str() {
                ";" | "{" | "}" | "(" | "[" | "#[" => return None,
                ")" | "]" => cursor = token.matching?,
                _ => {}
            },
            _ => {}
        }
    }
    None
}
