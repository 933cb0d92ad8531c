use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tree_sitter::Parser;

use super::tokens::TokenStream;

/// A source file turned into its token stream.
pub struct ParsedSource {
    pub path: PathBuf,
    pub source: String,
    pub tokens: TokenStream,
}

impl ParsedSource {
    /// Line terminator used by the file, for rules that emit multi-line text.
    pub fn newline(&self) -> &'static str {
        if self.source.contains("\r\n") {
            "\r\n"
        } else {
            "\n"
        }
    }
}

/// Trait that abstracts PHP tokenizing backends.
pub trait PhpParser {
    fn parse_source(&mut self, path: &Path, source: String) -> Result<ParsedSource>;

    fn parse_file(&mut self, path: &Path) -> Result<ParsedSource> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        self.parse_source(path, source)
    }
}

/// Parser wrapper that uses tree-sitter-php leaves as the token source.
pub struct TreeSitterPhpParser {
    parser: Parser,
}

impl TreeSitterPhpParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_php::language();
        parser
            .set_language(language)
            .context("failed to load tree-sitter-php language")?;

        Ok(Self { parser })
    }
}

impl PhpParser for TreeSitterPhpParser {
    fn parse_source(&mut self, path: &Path, source: String) -> Result<ParsedSource> {
        let tree = self
            .parser
            .parse(source.as_str(), None)
            .with_context(|| format!("tree-sitter failed to parse {}", path.display()))?;
        let tokens = TokenStream::from_tree(&tree, &source);

        Ok(ParsedSource {
            path: path.to_path_buf(),
            source,
            tokens,
        })
    }
}
