use crate::backend::{Engine, Outcome};
use crate::report::Reporter;
use crate::types::{CaseOutcome, Expectation, SuiteResult, TestCase, TestSuite};
use serde_json::{Number, Value};
use std::io::{self, Write};

/// Structural equality over the JSON value model: objects ignore key order,
/// arrays are element-wise, numbers compare by exact value (`1 == 1.0`).
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_eq(x, y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| json_eq(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| json_eq(v, w)))
        }
        _ => a == b,
    }
}

fn numbers_eq(x: &Number, y: &Number) -> bool {
    match (x.as_f64().filter(|_| x.is_f64()), y.as_f64().filter(|_| y.is_f64())) {
        (Some(a), Some(b)) => a == b,
        (Some(f), None) => int_eq_float(y, f),
        (None, Some(f)) => int_eq_float(x, f),
        (None, None) => match (x.as_i64(), y.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => x.as_u64().is_some() && x.as_u64() == y.as_u64(),
        },
    }
}

/// An integer equals a float only if the float is integral and converts back
/// to exactly that integer.
fn int_eq_float(int: &Number, f: f64) -> bool {
    // 2^63 and 2^64 are exact as f64; `as` saturates outside them.
    const I64_END: f64 = 9_223_372_036_854_775_808.0;
    const U64_END: f64 = 18_446_744_073_709_551_616.0;
    if !f.is_finite() || f.fract() != 0.0 {
        return false;
    }
    if let Some(i) = int.as_i64() {
        return (-I64_END..I64_END).contains(&f) && f as i64 == i;
    }
    if let Some(u) = int.as_u64() {
        return (0.0..U64_END).contains(&f) && f as u64 == u;
    }
    false
}

/// Decide pass/fail for one evaluation outcome.
pub fn judge(case: &TestCase, outcome: &Outcome) -> CaseOutcome {
    match (&case.expectation, outcome) {
        (Expectation::Error(_), Outcome::Value(actual)) => {
            CaseOutcome::fail(format!("Expected error, got {actual}"))
        }
        (Expectation::Error(expected), Outcome::Failure(failure)) => {
            match (expected.kind.as_deref(), failure.error_type()) {
                (Some(want), Some(got)) if want == got => CaseOutcome::pass(),
                (want, _) => CaseOutcome::fail(format!(
                    "Expected error type {}, got {}",
                    want.unwrap_or("<none>"),
                    failure.category()
                )),
            }
        }
        (Expectation::Result(expected), Outcome::Value(actual)) => {
            if json_eq(expected, actual) {
                CaseOutcome::pass()
            } else {
                CaseOutcome::fail(format!("Expected {expected}, got {actual}"))
            }
        }
        (Expectation::Result(expected), Outcome::Failure(failure)) => CaseOutcome::fail(format!(
            "Expected {expected}, error {} was raised",
            failure.message
        )),
    }
}

pub fn run_case<E: Engine + ?Sized>(engine: &E, case: &TestCase) -> CaseOutcome {
    let outcome = engine.evaluate(&case.rule, &case.data);
    judge(case, &outcome)
}

/// Run every case of a suite in listed order. Skipped entries are not counted.
pub fn run_suite<E, W>(
    engine: &E,
    suite: &TestSuite,
    reporter: &mut Reporter<W>,
) -> io::Result<SuiteResult>
where
    E: Engine + ?Sized,
    W: Write,
{
    reporter.suite_started(&suite.name)?;
    let mut result = SuiteResult::default();
    for case in suite.cases() {
        result.total += 1;
        reporter.case_started(result.total, case.description.as_deref())?;
        let outcome = run_case(engine, case);
        if outcome.passed {
            result.passed += 1;
        } else {
            reporter.case_failed(result.total, outcome.message.as_deref().unwrap_or(""))?;
        }
    }
    reporter.suite_finished(&result)?;
    Ok(result)
}
