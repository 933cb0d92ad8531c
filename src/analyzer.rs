pub mod classifier;
pub mod config;
pub mod directives;
pub mod fix;
pub mod names;
pub mod parser;
pub mod rules;
pub mod tokens;

use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use config::AnalyzerConfig;
use directives::Directives;
use indicatif::ProgressBar;
use names::FileContext;
use parser::{ParsedSource, PhpParser, TreeSitterPhpParser};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::Serialize;
use tracing::{debug, info};
use tree_sitter::Point;
use walkdir::WalkDir;

/// Upper bound on fix passes per file; each pass re-tokenizes the rewritten text.
const MAX_FIX_PASSES: usize = 10;

/// Represents the severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Span {
    pub start: Point,
    pub end: Point,
}

/// A diagnostic emitted by a rule.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub file: PathBuf,
    pub severity: Severity,
    /// Stable `<group>/<rule>[/<detail>]` code.
    pub code: String,
    pub message: String,
    pub span: Span,
    pub snippet_line: Option<String>,
    pub caret_len: usize,
    pub fixable: bool,
}

impl Diagnostic {
    pub fn new(
        file: PathBuf,
        severity: Severity,
        code: impl Into<String>,
        message: impl Into<String>,
        span: Span,
        snippet_line: Option<String>,
    ) -> Self {
        let caret_len = if span.start.row == span.end.row {
            span.end.column.saturating_sub(span.start.column).max(1)
        } else {
            1
        };

        Self {
            file,
            severity,
            code: code.into(),
            message: message.into(),
            span,
            snippet_line,
            caret_len,
            fixable: false,
        }
    }

    pub fn fixable(mut self) -> Self {
        self.fixable = true;
        self
    }

    /// 1-based line of the diagnostic.
    pub fn line(&self) -> usize {
        self.span.start.row + 1
    }

    pub fn to_json(&self) -> DiagnosticJson {
        DiagnosticJson {
            file: self.file.display().to_string(),
            line: self.line(),
            column: self.span.start.column + 1,
            severity: self.severity.to_string(),
            code: self.code.clone(),
            message: self.message.clone(),
            fixable: self.fixable,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticJson {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub severity: String,
    pub code: String,
    pub message: String,
    pub fixable: bool,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const RESET: &str = "\x1b[0m";
        const DIM: &str = "\x1b[2m";
        const BOLD_RED: &str = "\x1b[1;31m";
        const BOLD_YELLOW: &str = "\x1b[1;33m";
        const BLUE: &str = "\x1b[34m";

        let severity_color = match self.severity {
            Severity::Warning => BOLD_YELLOW,
            Severity::Error => BOLD_RED,
        };
        let fixable = if self.fixable { " (fixable)" } else { "" };
        writeln!(
            f,
            "{severity_color}{}{RESET}: {} {DIM}[{}]{fixable}{RESET}",
            self.severity, self.message, self.code
        )?;
        writeln!(
            f,
            " --> {}:{}:{}",
            self.file.display(),
            self.line(),
            self.span.start.column + 1
        )?;

        if let Some(line) = &self.snippet_line {
            writeln!(f, "{BLUE}    |{RESET}")?;
            writeln!(f, "{BLUE}{:>3}{RESET} {BLUE}|{RESET} {line}", self.line())?;
            writeln!(
                f,
                "{BLUE}    |{RESET} {}{severity_color}{}{RESET}",
                " ".repeat(self.span.start.column),
                "^".repeat(self.caret_len)
            )?;
        }

        Ok(())
    }
}

/// Rewritten text of one file after the fix loop.
#[derive(Debug, Clone)]
pub struct FixReport {
    pub original: String,
    pub fixed: String,
    pub applied: usize,
    pub passes: usize,
}

impl FixReport {
    pub fn changed(&self) -> bool {
        self.original != self.fixed
    }
}

/// Runs the configured rules over PHP files.
pub struct Analyzer {
    rules: Vec<Box<dyn rules::DiagnosticRule>>,
}

impl Analyzer {
    pub fn new(config: Option<AnalyzerConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();
        // fail early if the grammar cannot be loaded
        TreeSitterPhpParser::new()?;

        let rules = rules::build_rules(&config);
        debug!(rules = rules.len(), "analyzer ready");
        Ok(Self { rules })
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    pub fn analyse_source(&self, path: &Path, source: &str) -> Result<Vec<Diagnostic>> {
        let mut parser = TreeSitterPhpParser::new()?;
        let parsed = parser.parse_source(path, source.to_string())?;
        Ok(self.collect_diagnostics(&parsed))
    }

    pub fn analyse_file(&self, path: &Path) -> Result<Vec<Diagnostic>> {
        let mut parser = TreeSitterPhpParser::new()?;
        let parsed = parser.parse_file(path)?;
        Ok(self.collect_diagnostics(&parsed))
    }

    /// Analyses `paths` in parallel, one parser per worker thread.
    pub fn analyse_files_with_progress(
        &self,
        paths: &[PathBuf],
        root: &Path,
        progress: Option<&ProgressBar>,
    ) -> Result<Vec<Diagnostic>> {
        debug!(files = paths.len(), root = %root.display(), "analysing files");

        let results = paths
            .par_iter()
            .map_init(TreeSitterPhpParser::new, |parser, path| -> Result<Vec<Diagnostic>> {
                let parser = parser
                    .as_mut()
                    .map_err(|err| anyhow!("failed to initialise parser: {err:#}"))?;
                let parsed = parser.parse_file(path)?;
                let diagnostics = self.collect_diagnostics(&parsed);
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                Ok(diagnostics)
            })
            .collect::<Vec<_>>();

        let mut diagnostics = Vec::new();
        for result in results {
            diagnostics.extend(result?);
        }
        sort_diagnostics(&mut diagnostics);
        Ok(diagnostics)
    }

    pub fn analyse_root(&self, root: &Path) -> Result<Vec<Diagnostic>> {
        let paths = collect_php_files(root)?;
        self.analyse_files_with_progress(&paths, root, None)
    }

    /// Applies fixes until no change-set applies or the pass limit is reached.
    pub fn fix_source(&self, path: &Path, source: &str) -> Result<FixReport> {
        let mut parser = TreeSitterPhpParser::new()?;
        self.fix_with_parser(&mut parser, path, source.to_string())
    }

    /// Fix reports for the files in `paths` whose text would change.
    pub fn fix_files(&self, paths: &[PathBuf]) -> Result<BTreeMap<PathBuf, FixReport>> {
        let results = paths
            .par_iter()
            .map_init(TreeSitterPhpParser::new, |parser, path| -> Result<(PathBuf, FixReport)> {
                let parser = parser
                    .as_mut()
                    .map_err(|err| anyhow!("failed to initialise parser: {err:#}"))?;
                let source = fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let report = self.fix_with_parser(parser, path, source)?;
                Ok((path.clone(), report))
            })
            .collect::<Vec<_>>();

        let mut reports = BTreeMap::new();
        for result in results {
            let (path, report) = result?;
            if report.changed() {
                reports.insert(path, report);
            }
        }
        Ok(reports)
    }

    pub fn fix_root(&self, root: &Path) -> Result<BTreeMap<PathBuf, FixReport>> {
        let paths = collect_php_files(root)?;
        self.fix_files(&paths)
    }

    fn fix_with_parser(
        &self,
        parser: &mut TreeSitterPhpParser,
        path: &Path,
        source: String,
    ) -> Result<FixReport> {
        let mut text = source.clone();
        let mut applied = 0;
        let mut passes = 0;

        while passes < MAX_FIX_PASSES {
            passes += 1;
            let parsed = parser.parse_source(path, text)?;
            let change_sets = self.collect_change_sets(&parsed);
            if change_sets.is_empty() {
                text = parsed.source;
                break;
            }

            let outcome = fix::apply_change_sets(&parsed.source, &change_sets);
            debug!(
                file = %path.display(),
                pass = passes,
                applied = outcome.applied,
                rejected = outcome.rejected,
                "fix pass"
            );
            text = outcome.text;
            if outcome.applied == 0 {
                break;
            }
            applied += outcome.applied;
        }

        if applied > 0 {
            info!(file = %path.display(), applied, passes, "fixed file");
        }

        Ok(FixReport {
            original: source,
            fixed: text,
            applied,
            passes,
        })
    }

    fn active_rules<'a>(
        &'a self,
        directives: &'a Directives,
    ) -> impl Iterator<Item = &'a dyn rules::DiagnosticRule> + 'a {
        self.rules
            .iter()
            .map(|rule| rule.as_ref())
            .filter(|rule| directives.should_run_rule(rule.name()))
    }

    fn collect_diagnostics(&self, parsed: &ParsedSource) -> Vec<Diagnostic> {
        let directives = Directives::from_tokens(&parsed.tokens);
        if directives.ignores_everything() {
            debug!(file = %parsed.path.display(), "file ignored by directive");
            return Vec::new();
        }

        let context = FileContext::from_tokens(&parsed.tokens);
        let mut diagnostics: Vec<Diagnostic> = self
            .active_rules(&directives)
            .flat_map(|rule| rule.run(parsed, &context))
            .filter(|diag| !directives.suppresses(&diag.code, diag.line()))
            .collect();
        sort_diagnostics(&mut diagnostics);
        diagnostics
    }

    fn collect_change_sets(&self, parsed: &ParsedSource) -> Vec<fix::ChangeSet> {
        let directives = Directives::from_tokens(&parsed.tokens);
        if directives.ignores_everything() {
            return Vec::new();
        }

        let context = FileContext::from_tokens(&parsed.tokens);
        self.active_rules(&directives)
            .flat_map(|rule| rule.fix(parsed, &context))
            .filter(|change_set| !directives.suppresses(change_set.code(), change_set.line()))
            .collect()
    }
}

fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        a.file
            .cmp(&b.file)
            .then(a.span.start.row.cmp(&b.span.start.row))
            .then(a.span.start.column.cmp(&b.span.start.column))
            .then(a.code.cmp(&b.code))
    });
}

pub fn collect_php_files(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(if is_php_file(root) {
            vec![root.to_path_buf()]
        } else {
            vec![]
        });
    }

    let mut php_files = Vec::new();

    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        if entry.file_type().is_file() && is_php_file(path) {
            php_files.push(path.to_path_buf());
        }
    }

    php_files.sort();
    Ok(php_files)
}

pub fn collect_php_files_from_roots(roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut php_files = Vec::new();
    for root in roots {
        php_files.extend(collect_php_files(root)?);
    }
    php_files.sort();
    php_files.dedup();
    Ok(php_files)
}

pub fn is_php_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("php"))
}
