#![allow(dead_code)]

use jsonlogic_compat::backend::{Engine, EngineFailure, Outcome};
use jsonlogic_compat::runner::json_eq;
use serde_json::{json, Value};
use std::cell::Cell;
use std::fs;
use std::path::Path;

/// Knows `==`, `var` and literals; anything else raises `error_type`.
pub struct MockLogic {
    pub name: String,
    pub error_type: Option<String>,
}

impl MockLogic {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            error_type: Some("UnknownOperator".into()),
        }
    }

    pub fn raising(name: &str, error_type: Option<&str>) -> Self {
        Self {
            name: name.into(),
            error_type: error_type.map(str::to_string),
        }
    }

    fn apply(&self, rule: &Value, data: &Value) -> Result<Value, EngineFailure> {
        let Value::Object(map) = rule else {
            return Ok(rule.clone());
        };
        let Some((op, args)) = map.iter().next() else {
            return Ok(rule.clone());
        };
        match (op.as_str(), args) {
            ("==", Value::Array(pair)) if pair.len() == 2 => {
                let l = self.apply(&pair[0], data)?;
                let r = self.apply(&pair[1], data)?;
                Ok(Value::Bool(json_eq(&l, &r)))
            }
            ("var", Value::String(key)) => Ok(data.get(key).cloned().unwrap_or(Value::Null)),
            _ => Err(match &self.error_type {
                Some(t) => EngineFailure::typed(t.clone(), format!("unknown operator {op}")),
                None => EngineFailure::untyped("RuntimeError", format!("unknown operator {op}")),
            }),
        }
    }
}

impl Engine for MockLogic {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, rule: &Value, data: &Value) -> Outcome {
        self.apply(rule, data).into()
    }
}

/// Returns how many times it has been called. Used to show that the harness
/// itself keeps no state between cases.
pub struct Counter {
    pub calls: Cell<u64>,
}

impl Engine for Counter {
    fn name(&self) -> &str {
        "counter"
    }

    fn evaluate(&self, _rule: &Value, _data: &Value) -> Outcome {
        self.calls.set(self.calls.get() + 1);
        Outcome::Value(json!(self.calls.get()))
    }
}

pub fn write_suites(dir: &Path, suites: &[(&str, Value)]) {
    let names: Vec<&str> = suites.iter().map(|(name, _)| *name).collect();
    fs::write(dir.join("index.json"), serde_json::to_string(&names).unwrap()).unwrap();
    for (name, cases) in suites {
        fs::write(dir.join(name), serde_json::to_string_pretty(cases).unwrap()).unwrap();
    }
}
