use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// What a case expects from the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    /// Evaluation succeeds with a value structurally equal to this one.
    Result(Value),
    /// Evaluation fails with this descriptor.
    Error(ExpectedError),
}

/// `{"type": "..."}` plus whatever else the suite author put in the descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedError {
    /// `None` when the descriptor has no string `type`; such a case can never pass.
    pub kind: Option<String>,
    pub raw: Value,
}

impl ExpectedError {
    pub fn from_value(raw: Value) -> Self {
        let kind = raw
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self { kind, raw }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub description: Option<String>,
    pub rule: Value,
    pub data: Value,
    pub expectation: Expectation,
}

/// One entry of a suite file, validated once at load time.
#[derive(Debug, Clone, PartialEq)]
pub enum SuiteEntry {
    Case(TestCase),
    /// Non-object entries (section comments in the corpus) and objects with no pass criterion.
    Skip,
}

impl SuiteEntry {
    /// Classify a raw suite entry. `error` wins over `result` when both are present.
    pub fn from_value(suite: &str, position: usize, value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return SuiteEntry::Skip;
        };
        let expectation = match (map.remove("error"), map.remove("result")) {
            (Some(error), result) => {
                if result.is_some() {
                    warn!(
                        suite,
                        position, "case declares both result and error; expecting the error"
                    );
                }
                Expectation::Error(ExpectedError::from_value(error))
            }
            (None, Some(result)) => Expectation::Result(result),
            (None, None) => return SuiteEntry::Skip,
        };
        SuiteEntry::Case(TestCase::from_parts(map, expectation))
    }

    pub fn as_case(&self) -> Option<&TestCase> {
        match self {
            SuiteEntry::Case(case) => Some(case),
            SuiteEntry::Skip => None,
        }
    }
}

impl TestCase {
    fn from_parts(mut map: Map<String, Value>, expectation: Expectation) -> Self {
        let description = match map.remove("description") {
            Some(Value::String(s)) => Some(s),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        TestCase {
            description,
            rule: map.remove("rule").unwrap_or(Value::Null),
            data: map.remove("data").unwrap_or(Value::Null),
            expectation,
        }
    }

    pub fn expects_error(&self) -> bool {
        matches!(self.expectation, Expectation::Error(_))
    }
}

#[derive(Debug, Clone)]
pub struct TestSuite {
    pub name: String,
    pub entries: Vec<SuiteEntry>,
}

impl TestSuite {
    pub fn cases(&self) -> impl Iterator<Item = &TestCase> {
        self.entries.iter().filter_map(SuiteEntry::as_case)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseOutcome {
    pub passed: bool,
    pub message: Option<String>,
}

impl CaseOutcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            message: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteResult {
    pub passed: u64,
    pub total: u64,
}

impl SuiteResult {
    pub fn new(passed: u64, total: u64) -> Self {
        Self { passed, total }
    }

    /// Pass rate in percent, `None` for an empty suite.
    pub fn success_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.passed as f64 / self.total as f64 * 100.0)
    }
}
