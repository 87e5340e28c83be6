use std::path::PathBuf;
use thiserror::Error;

/// Setup and persistence faults. Evaluation faults never show up here; they are
/// folded into [`crate::backend::Outcome::Failure`] by the adapters.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("suite index not found: {}", path.display())]
    MissingIndex { path: PathBuf },

    #[error("failed to parse suite index {}: {source}", path.display())]
    MalformedIndex {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("suite file not found: {}", path.display())]
    MissingSuite { path: PathBuf },

    #[error("failed to parse suite file {}: {source}", path.display())]
    MalformedSuite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown engine: {0}")]
    UnknownEngine(String),

    #[error("could not load engine {name}: {reason}")]
    EngineUnavailable { name: String, reason: String },

    #[error("invalid engine config {}: {reason}", path.display())]
    InvalidConfig { path: PathBuf, reason: String },

    #[error("failed to write results to {}: {source}", path.display())]
    SummaryWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HarnessError {
    /// Faults that abort a single engine but leave other engines in the batch runnable.
    pub fn is_engine_local(&self) -> bool {
        matches!(self, HarnessError::EngineUnavailable { .. })
    }
}

pub type Result<T, E = HarnessError> = std::result::Result<T, E>;
