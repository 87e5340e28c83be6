//! One harness invocation: load suites, run them against each requested
//! engine, fold the counts into the ecosystem's results file.

use crate::error::HarnessError;
use crate::registry::EngineRegistry;
use crate::report::Reporter;
use crate::runner::run_suite;
use crate::suites::load_suites;
use crate::summary::Summary;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info};

/// What happens to the results file when the run aborts on a setup fault.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PersistPolicy {
    /// Write nothing unless the run completes.
    #[default]
    Strict,
    /// Always write whatever was accumulated.
    BestEffort,
}

#[derive(Debug, Clone)]
pub struct RunPlan {
    pub suites_dir: PathBuf,
    pub results_file: PathBuf,
    pub engines: Vec<String>,
    pub policy: PersistPolicy,
}

#[derive(Debug)]
pub struct RunReport {
    pub summary: Summary,
    /// Engines skipped because their adapter could not be constructed.
    pub unavailable: Vec<HarnessError>,
}

pub fn run<W: Write>(
    registry: &EngineRegistry,
    plan: &RunPlan,
    reporter: &mut Reporter<W>,
) -> Result<RunReport> {
    let mut summary = Summary::load(&plan.results_file);
    match run_engines(registry, plan, &mut summary, reporter) {
        Ok(unavailable) => {
            let none_ran = unavailable.len() >= plan.engines.len();
            if none_ran && plan.policy == PersistPolicy::Strict {
                info!(results = %plan.results_file.display(), "no engine ran, results left untouched");
            } else {
                persist(&summary, plan, reporter)?;
            }
            Ok(RunReport {
                summary,
                unavailable,
            })
        }
        Err(e) => {
            if plan.policy == PersistPolicy::BestEffort {
                if let Err(write_err) = persist(&summary, plan, reporter) {
                    error!("{write_err:#}");
                }
            }
            Err(e)
        }
    }
}

fn run_engines<W: Write>(
    registry: &EngineRegistry,
    plan: &RunPlan,
    summary: &mut Summary,
    reporter: &mut Reporter<W>,
) -> Result<Vec<HarnessError>> {
    if let Some(unknown) = plan.engines.iter().find(|name| !registry.contains(name)) {
        return Err(HarnessError::UnknownEngine(unknown.clone()).into());
    }

    let suites = load_suites(&plan.suites_dir)?;
    reporter.suites_loaded(suites.len())?;

    let mut unavailable = Vec::new();
    for name in &plan.engines {
        let engine = match registry.resolve(name) {
            Ok(engine) => engine,
            Err(e) if e.is_engine_local() => {
                error!("{e}");
                unavailable.push(e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        info!(engine = %name, suites = suites.len(), "starting engine");
        summary.reset(name);
        reporter.engine_started(name)?;
        for suite in &suites {
            let result = run_suite(&engine, suite, reporter)
                .with_context(|| format!("writing report for suite {}", suite.name))?;
            summary.add_result(&suite.name, name, result.passed, result.total);
        }
        reporter.engine_finished(name, summary.total(name))?;
    }
    Ok(unavailable)
}

fn persist<W: Write>(summary: &Summary, plan: &RunPlan, reporter: &mut Reporter<W>) -> Result<()> {
    summary.persist(&plan.results_file)?;
    reporter.results_saved(&plan.results_file)?;
    Ok(())
}
