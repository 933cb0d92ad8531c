use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Result;

use php_sniffs::analyzer::{Analyzer, Diagnostic, collect_php_files};

fn diagnostic_summary(diag: &Diagnostic) -> String {
    format!("{}:{} {} [{}]", diag.line(), diag.span.start.column + 1, diag.message, diag.code)
}

fn failure_report(failures: &BTreeMap<PathBuf, Vec<String>>, passed: usize) -> String {
    let rule = "━".repeat(52);
    let mut report = format!("\n\n{} valid fixture(s) FAILED, {} passed\n", failures.len(), passed);
    for (file, diagnostics) in failures {
        let _ = writeln!(report, "\n{rule}\nFAILED: {} (should have NO diagnostics)\n{rule}", file.display());
        for (i, diag) in diagnostics.iter().enumerate() {
            let _ = writeln!(report, "  {:2}. {}", i + 1, diag);
        }
    }
    report
}

#[test]
fn valid_fixtures_have_no_diagnostics() -> Result<()> {
    let valid_dir = Path::new("tests/valid");
    let php_files = collect_php_files(valid_dir)?;
    assert!(!php_files.is_empty(), "no fixtures under {}", valid_dir.display());

    let analyzer = Analyzer::new(None)?;
    let mut failures: BTreeMap<PathBuf, Vec<String>> = BTreeMap::new();
    for diag in analyzer.analyse_root(valid_dir)? {
        failures
            .entry(diag.file.clone())
            .or_default()
            .push(diagnostic_summary(&diag));
    }

    let passed = php_files.len() - failures.len();
    if !failures.is_empty() {
        panic!("{}", failure_report(&failures, passed));
    }

    println!("\n✓ All {} valid fixture(s) passed", passed);
    Ok(())
}

#[test]
fn valid_fixtures_are_not_rewritten() -> Result<()> {
    let analyzer = Analyzer::new(None)?;
    let reports = analyzer.fix_root(Path::new("tests/valid"))?;
    let rewritten: Vec<String> = reports.keys().map(|file| file.display().to_string()).collect();
    assert!(rewritten.is_empty(), "fixes rewrote valid fixtures: {rewritten:?}");
    Ok(())
}
