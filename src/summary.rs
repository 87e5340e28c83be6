//! Persisted, cross-run, cross-engine pass/total record.
//!
//! One file per language ecosystem (e.g. `results/rust.json`), shared by every
//! engine of that ecosystem. A run only ever touches the slots of the engine it
//! runs; everything else in the file is carried over untouched.

use crate::error::{HarnessError, Result};
use crate::types::SuiteResult;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub test_suites: IndexMap<String, IndexMap<String, SuiteResult>>,
    #[serde(default)]
    pub totals: IndexMap<String, SuiteResult>,
    /// Fields written by other tooling; round-tripped as is.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Summary {
    /// Read a previous summary. A missing or unreadable file yields an empty one.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no previous results, starting fresh");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read previous results, starting fresh");
                return Self::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(summary) => summary,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed previous results, starting fresh");
                Self::default()
            }
        }
    }

    /// Drop everything recorded for `engine` and seed its total at zero.
    /// Other engines are left alone.
    pub fn reset(&mut self, engine: &str) {
        for results in self.test_suites.values_mut() {
            results.shift_remove(engine);
        }
        self.test_suites.retain(|_, results| !results.is_empty());
        self.totals.insert(engine.to_string(), SuiteResult::default());
    }

    /// Record one suite's counts for `engine`. Call at most once per (suite, engine) per run.
    pub fn add_result(&mut self, suite: &str, engine: &str, passed: u64, total: u64) {
        let slot = self
            .test_suites
            .entry(suite.to_string())
            .or_default()
            .entry(engine.to_string())
            .or_default();
        slot.passed += passed;
        slot.total += total;

        let totals = self.totals.entry(engine.to_string()).or_default();
        totals.passed += passed;
        totals.total += total;
    }

    pub fn suite_result(&self, suite: &str, engine: &str) -> Option<SuiteResult> {
        self.test_suites.get(suite)?.get(engine).copied()
    }

    pub fn total(&self, engine: &str) -> Option<SuiteResult> {
        self.totals.get(engine).copied()
    }

    pub fn to_pretty_json(&self) -> String {
        // Maps with string keys and plain numbers cannot fail to serialize.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Write the whole summary, pretty-printed, via a temp file and rename.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let write_err = |source: std::io::Error| HarnessError::SummaryWrite {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let mut body = self.to_pretty_json();
        body.push('\n');
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(write_err)?;
        fs::rename(&tmp, path).map_err(write_err)?;
        Ok(())
    }
}
