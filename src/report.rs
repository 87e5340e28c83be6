use crate::error::{HarnessError, Result};
use crate::summary::Summary;
use crate::types::SuiteResult;
use chrono::Utc;
use colored::Colorize;
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

/// Line-oriented run output: progress before each case, detail for each
/// failure, a rate line per suite. Passing cases print nothing beyond progress.
pub struct Reporter<W: Write> {
    out: W,
    silent: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out, silent: false }
    }

    /// Suppress per-case progress lines. Failures and rates are still printed.
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn suites_loaded(&mut self, count: usize) -> io::Result<()> {
        writeln!(self.out, "Successfully loaded {count} test suites")
    }

    pub fn engine_started(&mut self, engine: &str) -> io::Result<()> {
        writeln!(self.out, "\nTesting engine: {}", engine.bold())
    }

    pub fn suite_started(&mut self, suite: &str) -> io::Result<()> {
        writeln!(self.out, "\nRunning suite: {suite}")
    }

    pub fn case_started(&mut self, index: u64, description: Option<&str>) -> io::Result<()> {
        if self.silent {
            return Ok(());
        }
        writeln!(self.out, "Running test {index}: {}", description.unwrap_or(""))
    }

    pub fn case_failed(&mut self, index: u64, message: &str) -> io::Result<()> {
        writeln!(
            self.out,
            "{} {}",
            format!("Test {index} failed.").red().bold(),
            message
        )
    }

    pub fn suite_finished(&mut self, result: &SuiteResult) -> io::Result<()> {
        let Some(rate) = result.success_rate() else {
            return Ok(());
        };
        let line = format!(
            "Results: {}/{} passed ({rate:.2}%)",
            result.passed, result.total
        );
        let line = match SuccessClass::from_rate(rate) {
            SuccessClass::High => line.green(),
            SuccessClass::Medium => line.yellow(),
            _ => line.red(),
        };
        writeln!(self.out, "\n{line}")
    }

    pub fn engine_finished(&mut self, engine: &str, totals: Option<SuiteResult>) -> io::Result<()> {
        let totals = totals.unwrap_or_default();
        writeln!(
            self.out,
            "\nTests with {engine} have finished: {}/{} passed",
            totals.passed, totals.total
        )
    }

    pub fn results_saved(&mut self, path: &Path) -> io::Result<()> {
        writeln!(self.out, "Results saved to {}", path.display())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessClass {
    High,
    Medium,
    Low,
    Na,
}

impl SuccessClass {
    pub fn from_rate(rate: f64) -> Self {
        if rate >= 100.0 {
            SuccessClass::High
        } else if rate > 0.0 {
            SuccessClass::Medium
        } else {
            SuccessClass::Low
        }
    }

    pub fn from_counts(passed: u64, total: u64) -> Self {
        SuiteResult::new(passed, total)
            .success_rate()
            .map_or(SuccessClass::Na, Self::from_rate)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: String,
    pub class: SuccessClass,
}

impl Cell {
    fn na() -> Self {
        Self {
            value: "N/A".to_string(),
            class: SuccessClass::Na,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineColumn {
    pub language: String,
    pub engine: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixRow {
    pub suite: String,
    pub cases: u64,
    pub cells: Vec<Cell>,
}

/// Suites × engines compatibility table over every ecosystem's results file.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub engines: Vec<EngineColumn>,
    pub rows: Vec<MatrixRow>,
    pub totals: Vec<Cell>,
    pub rates: Vec<Cell>,
    /// UTC time the table was produced, printed under it when set.
    pub generated_at: Option<String>,
}

impl Matrix {
    pub fn generated_at(mut self, at: impl Into<String>) -> Self {
        self.generated_at = Some(at.into());
        self
    }

    pub fn generated_now(self) -> Self {
        self.generated_at(Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string())
    }
}

/// Read every `*.json` summary directly inside `dir`, keyed by file stem.
/// Files that do not parse are skipped.
pub fn load_results(dir: &Path) -> Result<IndexMap<String, Summary>> {
    let mut results = IndexMap::new();
    for entry in WalkDir::new(dir).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| HarnessError::Read {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "json") {
            continue;
        }
        let Some(language) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let parsed = fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|c| serde_json::from_str::<Summary>(&c).map_err(|e| e.to_string()));
        match parsed {
            Ok(summary) => {
                results.insert(language, summary);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable results file"),
        }
    }
    Ok(results)
}

pub fn build_matrix(results: &IndexMap<String, Summary>) -> Matrix {
    let mut languages: Vec<&String> = results.keys().collect();
    languages.sort();

    let mut engines = Vec::new();
    for language in languages {
        let summary = &results[language];
        let mut names: BTreeSet<&str> = summary.totals.keys().map(String::as_str).collect();
        for per_engine in summary.test_suites.values() {
            names.extend(per_engine.keys().map(String::as_str));
        }
        engines.extend(names.into_iter().map(|engine| EngineColumn {
            language: language.clone(),
            engine: engine.to_string(),
        }));
    }

    let suites: BTreeSet<&str> = results
        .values()
        .flat_map(|s| s.test_suites.keys().map(String::as_str))
        .collect();

    let rows = suites
        .into_iter()
        .map(|suite| {
            let cases = results
                .values()
                .filter_map(|s| s.test_suites.get(suite))
                .flat_map(|per_engine| per_engine.values())
                .map(|r| r.total)
                .find(|&total| total > 0)
                .unwrap_or(0);
            let cells = engines
                .iter()
                .map(|col| {
                    results[&col.language]
                        .suite_result(suite, &col.engine)
                        .map_or_else(Cell::na, |r| Cell {
                            value: r.passed.to_string(),
                            class: SuccessClass::from_counts(r.passed, cases),
                        })
                })
                .collect();
            MatrixRow {
                suite: suite.to_string(),
                cases,
                cells,
            }
        })
        .collect();

    let (totals, rates) = engines
        .iter()
        .map(|col| match results[&col.language].total(&col.engine) {
            Some(t) => {
                let rate = t.success_rate().unwrap_or(0.0);
                let class = SuccessClass::from_rate(rate);
                (
                    Cell {
                        value: t.passed.to_string(),
                        class,
                    },
                    Cell {
                        value: format!("{rate:.2}%"),
                        class,
                    },
                )
            }
            None => (Cell::na(), Cell::na()),
        })
        .unzip();

    Matrix {
        engines,
        rows,
        totals,
        rates,
        generated_at: None,
    }
}

pub fn render_markdown(matrix: &Matrix) -> String {
    let mut out = String::new();
    out.push_str("| Test Suite | Cases |");
    for col in &matrix.engines {
        out.push_str(&format!(" {} ({}) |", col.engine, col.language));
    }
    out.push_str("\n|---|---:|");
    for _ in &matrix.engines {
        out.push_str("---:|");
    }
    out.push('\n');

    let mut row = |label: &str, cases: &str, cells: &[Cell]| {
        out.push_str(&format!("| {label} | {cases} |"));
        for cell in cells {
            out.push_str(&format!(" {} |", cell.value));
        }
        out.push('\n');
    };
    for r in &matrix.rows {
        row(&r.suite, &r.cases.to_string(), &r.cells);
    }
    row("**Total**", "", &matrix.totals);
    row("**Success rate**", "", &matrix.rates);
    if let Some(at) = &matrix.generated_at {
        out.push_str(&format!("\nGenerated: {at}\n"));
    }
    out
}

pub fn render_text(matrix: &Matrix) -> String {
    let headers: Vec<String> = matrix
        .engines
        .iter()
        .map(|c| format!("{} ({})", c.engine, c.language))
        .collect();
    let label_width = matrix
        .rows
        .iter()
        .map(|r| r.suite.len())
        .chain(["Test Suite".len(), "Success rate".len()])
        .max()
        .unwrap_or(0);
    let widths: Vec<usize> = headers.iter().map(|h| h.len().max(7)).collect();

    let mut out = format!(
        "{}  {}",
        format!("{:<label_width$}", "Test Suite").bold(),
        format!("{:>5}", "Cases").bold()
    );
    for (h, &w) in headers.iter().zip(&widths) {
        out.push_str(&format!("  {}", format!("{h:>w$}").bold()));
    }
    out.push('\n');

    let paint = |cell: &Cell, width: usize| {
        let padded = format!("{:>width$}", cell.value);
        match cell.class {
            SuccessClass::High => padded.green().to_string(),
            SuccessClass::Medium => padded.yellow().to_string(),
            SuccessClass::Low => padded.red().to_string(),
            SuccessClass::Na => padded.dimmed().to_string(),
        }
    };
    let mut row = |label: &str, cases: &str, cells: &[Cell]| {
        out.push_str(&format!("{label:<label_width$}  {cases:>5}"));
        for (cell, w) in cells.iter().zip(&widths) {
            out.push_str("  ");
            out.push_str(&paint(cell, *w));
        }
        out.push('\n');
    };
    for r in &matrix.rows {
        row(&r.suite, &r.cases.to_string(), &r.cells);
    }
    row("Total", "", &matrix.totals);
    row("Success rate", "", &matrix.rates);
    if let Some(at) = &matrix.generated_at {
        out.push_str(&format!("\nGenerated: {at}\n"));
    }
    out
}
