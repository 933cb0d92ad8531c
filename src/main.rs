use php_sniffs::analyzer::{self, FixReport, config::AnalyzerConfig, is_php_file};
use serde::Serialize;
use serde_json::to_writer_pretty;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(ValueEnum, Clone, Copy)]
enum OutputFormat {
    Text,
    Json,
}

/// Entry point for the php-sniffs CLI.
#[derive(Parser)]
#[command(author, version, about = "Coding-standard sniffs and comment reformatter for PHP.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Configuration file; defaults to php_sniffs.yaml in the analysis root.
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a PHP file, directory or glob pattern.
    #[command(alias = "analyse")]
    Check {
        /// Path or glob pattern selecting PHP files.
        path: PathBuf,
        /// Rewrite files with every available fix.
        #[arg(long)]
        fix: bool,
        /// Print the fixed text instead of writing it.
        #[arg(long, requires = "fix")]
        dry_run: bool,
        /// Choose the CLI output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Run once, then keep checking PHP files as they change.
    Watch {
        /// Path or glob pattern selecting PHP files.
        path: PathBuf,
        /// Choose the CLI output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// List the rules enabled by the configuration.
    Rules,
}

struct CheckTargets {
    canonical_targets: Vec<PathBuf>,
    analysis_root: PathBuf,
    config: Option<AnalyzerConfig>,
}

impl CheckTargets {
    fn new(path: &Path, config_path: Option<PathBuf>) -> Result<Self> {
        let requested_targets = resolve_targets(path)?;
        let canonical_targets = canonicalize_paths(requested_targets)?;
        let analysis_root = derive_analysis_root(&canonical_targets);
        let config = load_config(config_path, &analysis_root)?;

        Ok(Self {
            canonical_targets,
            analysis_root,
            config,
        })
    }

    fn canonical_targets(&self) -> &[PathBuf] {
        &self.canonical_targets
    }

    fn analysis_root(&self) -> &Path {
        &self.analysis_root
    }

    fn config(&self) -> Option<AnalyzerConfig> {
        self.config.clone()
    }

    fn collect_php_files(&self) -> Result<Vec<PathBuf>> {
        analyzer::collect_php_files_from_roots(&self.canonical_targets)
    }
}

fn main() -> Result<()> {
    let Cli {
        command,
        config,
        verbose,
    } = Cli::parse();
    init_tracing(verbose);

    match command {
        Commands::Check {
            path,
            fix,
            dry_run,
            format,
        } => run_check(path, config, fix, dry_run, format),
        Commands::Watch { path, format } => run_watch_mode(path, config, format),
        Commands::Rules => list_rules(config),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_config(config_path: Option<PathBuf>, root: &Path) -> Result<Option<AnalyzerConfig>> {
    match AnalyzerConfig::find_config(config_path, root) {
        Some(path) => {
            debug!(config = %path.display(), "loading configuration");
            Ok(Some(AnalyzerConfig::load(path)?))
        }
        None => Ok(None),
    }
}

fn list_rules(config_path: Option<PathBuf>) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to read the current directory")?;
    let config = load_config(config_path, &cwd)?;
    let analyzer = analyzer::Analyzer::new(config)?;
    for name in analyzer.rule_names() {
        println!("{name}");
    }
    Ok(())
}

fn run_check(
    path: PathBuf,
    config_path: Option<PathBuf>,
    fix: bool,
    dry_run: bool,
    output_format: OutputFormat,
) -> Result<()> {
    let targets = CheckTargets::new(&path, config_path)?;
    let php_files = targets.collect_php_files()?;
    let php_file_count = php_files.len();

    if php_file_count == 0 {
        println!(
            "No PHP files found under {}",
            targets.analysis_root().display()
        );
        return Ok(());
    }

    if matches!(output_format, OutputFormat::Text) {
        println!("Checking {} file(s)...", php_file_count);
    }

    let analyzer = analyzer::Analyzer::new(targets.config())?;
    let show_progress = matches!(output_format, OutputFormat::Text);
    let (diagnostics, duration) =
        collect_diagnostics(&analyzer, &php_files, targets.analysis_root(), show_progress)?;

    emit_output(&diagnostics, output_format, php_file_count, duration)?;

    if fix {
        let reports = analyzer.fix_files(&php_files)?;
        write_fixes(&reports, dry_run)?;
    }

    Ok(())
}

fn write_fixes(reports: &BTreeMap<PathBuf, FixReport>, dry_run: bool) -> Result<()> {
    if reports.is_empty() {
        println!("No fixable diagnostics were detected.");
        return Ok(());
    }

    for (file, report) in reports {
        if dry_run {
            println!("--- {} ---", file.display());
            print!("{}", report.fixed);
            if !report.fixed.ends_with('\n') {
                println!();
            }
        } else {
            fs::write(file, &report.fixed)
                .with_context(|| format!("failed to write {}", file.display()))?;
            println!(
                "Fixed {} ({} change(s) in {} pass(es))",
                file.display(),
                report.applied,
                report.passes
            );
        }
    }

    Ok(())
}

fn collect_diagnostics(
    analyzer: &analyzer::Analyzer,
    paths: &[PathBuf],
    root: &Path,
    show_progress: bool,
) -> Result<(Vec<analyzer::Diagnostic>, Duration)> {
    let progress = if show_progress {
        let pb = ProgressBar::new(paths.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
                .expect("valid progress bar template")
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();
    let diagnostics = analyzer.analyse_files_with_progress(paths, root, progress.as_ref())?;
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    Ok((diagnostics, start.elapsed()))
}

fn emit_output(
    diagnostics: &[analyzer::Diagnostic],
    output_format: OutputFormat,
    file_count: usize,
    duration: Duration,
) -> Result<()> {
    let error_count = diagnostics
        .iter()
        .filter(|d| matches!(d.severity, analyzer::Severity::Error))
        .count();
    let warning_count = diagnostics
        .iter()
        .filter(|d| matches!(d.severity, analyzer::Severity::Warning))
        .count();
    let fixable_count = diagnostics.iter().filter(|d| d.fixable).count();

    match output_format {
        OutputFormat::Text => {
            if diagnostics.is_empty() {
                println!("No violations in {} PHP file(s).", file_count);
            } else {
                for diag in diagnostics {
                    println!("{diag}");
                }
            }

            println!(
                "Stats ▸ {} file(s) | {} error(s), {} warning(s) | {:.2}s ({} fixable with --fix)",
                file_count,
                error_count,
                warning_count,
                duration.as_secs_f64(),
                fixable_count
            );
        }
        OutputFormat::Json => {
            let stats = JsonStats {
                files: file_count,
                errors: error_count,
                warnings: warning_count,
                fixable: fixable_count,
                duration_seconds: duration.as_secs_f64(),
            };
            let output = JsonOutput {
                diagnostics: diagnostics.iter().map(|diag| diag.to_json()).collect(),
                stats,
            };

            let stdout = io::stdout();
            let mut handle = stdout.lock();
            to_writer_pretty(&mut handle, &output)?;
            handle.write_all(b"\n")?;
        }
    }

    Ok(())
}

fn run_watch_mode(path: PathBuf, config: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    run_check(path.clone(), config.clone(), false, false, format)?;
    watch_changes(path, config, format)
}

fn watch_changes(path: PathBuf, config: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    let targets = CheckTargets::new(&path, config)?;
    let (tx, rx) = channel::<notify::Result<Event>>();
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = tx.send(res);
        },
        Config::default(),
    )
    .with_context(|| "failed to initialize file watcher")?;

    for target in targets.canonical_targets() {
        let mode = if target.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(target, mode)
            .with_context(|| format!("failed to watch {}", target.display()))?;
    }

    println!("Watching for changes (Ctrl+C to exit)...");

    let analyzer = analyzer::Analyzer::new(targets.config())?;
    loop {
        match rx.recv() {
            Ok(Ok(event)) => {
                handle_watch_event(event, &analyzer, &targets, format)?;
            }
            Ok(Err(err)) => {
                warn!("watch error: {err}");
            }
            Err(err) => {
                return Err(anyhow!("file watch channel closed: {err}"));
            }
        }
    }
}

fn handle_watch_event(
    event: Event,
    analyzer: &analyzer::Analyzer,
    targets: &CheckTargets,
    format: OutputFormat,
) -> Result<()> {
    let mut changed_files = HashSet::new();

    for path in event.paths {
        if !is_php_file(&path) {
            continue;
        }
        if let Ok(canonical) = path.canonicalize() {
            if canonical.is_file() {
                changed_files.insert(canonical);
            }
        }
    }

    if changed_files.is_empty() {
        return Ok(());
    }

    let mut changed_vec: Vec<PathBuf> = changed_files.into_iter().collect();
    changed_vec.sort();

    if matches!(format, OutputFormat::Text) {
        println!("Detected {} PHP file(s) changed:", changed_vec.len());
        for file in &changed_vec {
            println!("  {}", file.display());
        }
    }

    let (diagnostics, duration) =
        collect_diagnostics(analyzer, &changed_vec, targets.analysis_root(), false)?;
    emit_output(&diagnostics, format, changed_vec.len(), duration)
}

fn resolve_targets(path: &Path) -> Result<Vec<PathBuf>> {
    if path_contains_glob(path) {
        let pattern = path.as_os_str().to_string_lossy().into_owned();
        let matches = glob(&pattern)
            .with_context(|| format!("invalid glob pattern \"{pattern}\""))?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("failed to read entries for pattern \"{pattern}\""))?;

        if matches.is_empty() {
            bail!("no files matched \"{pattern}\"");
        }

        Ok(matches)
    } else {
        Ok(vec![path.to_path_buf()])
    }
}

fn canonicalize_paths(paths: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    let mut canonical_paths = paths
        .into_iter()
        .map(|path| {
            path.canonicalize()
                .with_context(|| format!("failed to access {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;
    canonical_paths.sort();
    canonical_paths.dedup();
    Ok(canonical_paths)
}

/// Deepest directory containing every target.
fn derive_analysis_root(targets: &[PathBuf]) -> PathBuf {
    let directories: Vec<&Path> = targets
        .iter()
        .map(|target| {
            if target.is_file() {
                target.parent().unwrap_or(target)
            } else {
                target.as_path()
            }
        })
        .collect();

    let mut root = directories[0].to_path_buf();
    for dir in &directories[1..] {
        while !dir.starts_with(&root) {
            match root.parent() {
                Some(parent) => root = parent.to_path_buf(),
                None => break,
            }
        }
    }
    root
}

fn path_contains_glob(path: &Path) -> bool {
    path.as_os_str()
        .to_string_lossy()
        .chars()
        .any(|c| matches!(c, '*' | '?' | '[' | ']' | '{' | '}'))
}

#[derive(Serialize)]
struct JsonStats {
    files: usize,
    errors: usize,
    warnings: usize,
    fixable: usize,
    duration_seconds: f64,
}

#[derive(Serialize)]
struct JsonOutput {
    diagnostics: Vec<analyzer::DiagnosticJson>,
    stats: JsonStats,
}
