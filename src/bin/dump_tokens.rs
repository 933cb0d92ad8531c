use std::path::Path;

use anyhow::{Context, Result};
use php_sniffs::analyzer::parser::{PhpParser, TreeSitterPhpParser};
use php_sniffs::analyzer::tokens::Token;

fn link(label: &str, target: Option<usize>) -> String {
    target.map_or_else(String::new, |idx| format!(" {label}={idx}"))
}

fn print_token(idx: usize, token: &Token) {
    println!(
        "{idx:>5} {:>4}:{:<3} {:<18} {:?}{}{}{}{}",
        token.line(),
        token.start_point.column + 1,
        format!("{:?}", token.kind),
        token.text,
        link("match", token.matching),
        link("owner", token.scope_owner),
        link("opener", token.scope_opener),
        link("scope", token.parent_scope),
    );
}

fn main() -> Result<()> {
    let path = std::env::args().nth(1).context("path argument missing")?;

    let mut parser = TreeSitterPhpParser::new().context("load tree-sitter-php language")?;
    let parsed = parser.parse_file(Path::new(&path))?;

    for (idx, token) in parsed.tokens.iter() {
        print_token(idx, token);
    }
    Ok(())
}
