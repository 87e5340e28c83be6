pub mod backend;
pub mod config;
pub mod error;
pub mod harness;
pub mod registry;
pub mod report;
pub mod runner;
pub mod suites;
pub mod summary;
pub mod types;

pub use crate::backend::{Engine, EngineFailure, Outcome};
pub use crate::error::HarnessError;
