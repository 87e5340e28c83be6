use crate::error::{HarnessError, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::io::{Read, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use tracing::debug;
use wait_timeout::ChildExt;

/// Category used when an engine fault carries no type of its own.
pub const GENERIC_FAILURE: &str = "EngineError";

/// Category of an engine fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The engine reported its own error type; this is what `expectedError.type` matches.
    Typed(String),
    /// No type exposed; holds a class name for diagnostics only. Never matches an expectation.
    Untyped(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl EngineFailure {
    pub fn typed(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Typed(kind.into()),
            message: message.into(),
        }
    }

    pub fn untyped(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Untyped(class.into()),
            message: message.into(),
        }
    }

    /// The engine-provided type, if any.
    pub fn error_type(&self) -> Option<&str> {
        match &self.kind {
            FailureKind::Typed(t) => Some(t),
            FailureKind::Untyped(_) => None,
        }
    }

    /// Always present: the type, or the fallback class.
    pub fn category(&self) -> &str {
        match &self.kind {
            FailureKind::Typed(t) | FailureKind::Untyped(t) => t,
        }
    }

    /// Build a descriptor from an engine's JSON error object.
    pub fn from_descriptor(descriptor: &Value) -> Self {
        let message = descriptor
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| descriptor.to_string());
        match descriptor.get("type").and_then(Value::as_str) {
            Some(t) => Self::typed(t, message),
            None => Self::untyped(GENERIC_FAILURE, message),
        }
    }
}

impl fmt::Display for EngineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category(), self.message)
    }
}

/// Result of one evaluation attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Value(Value),
    Failure(EngineFailure),
}

impl From<std::result::Result<Value, EngineFailure>> for Outcome {
    fn from(r: std::result::Result<Value, EngineFailure>) -> Self {
        match r {
            Ok(v) => Outcome::Value(v),
            Err(e) => Outcome::Failure(e),
        }
    }
}

/// Uniform capability over a rule evaluator.
///
/// Implementations must never let a fault escape `evaluate`: everything the
/// underlying engine raises comes back as [`Outcome::Failure`].
pub trait Engine {
    fn name(&self) -> &str;
    fn evaluate(&self, rule: &Value, data: &Value) -> Outcome;
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn evaluate(&self, rule: &Value, data: &Value) -> Outcome {
        (**self).evaluate(rule, data)
    }
}

/// In-process adapter around a Rust evaluator function. Panics become untyped failures.
pub struct FnEngine<F> {
    name: String,
    apply: F,
}

impl<F> FnEngine<F>
where
    F: Fn(&Value, &Value) -> std::result::Result<Value, EngineFailure>,
{
    pub fn new(name: impl Into<String>, apply: F) -> Self {
        Self {
            name: name.into(),
            apply,
        }
    }
}

impl<F> Engine for FnEngine<F>
where
    F: Fn(&Value, &Value) -> std::result::Result<Value, EngineFailure>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, rule: &Value, data: &Value) -> Outcome {
        match catch_unwind(AssertUnwindSafe(|| (self.apply)(rule, data))) {
            Ok(result) => result.into(),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "engine panicked".to_string());
                Outcome::Failure(EngineFailure::untyped("Panic", message))
            }
        }
    }
}

/// Wire reply of an external engine: `{"result": ...}` or `{"error": {...}}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Response {
    Result(Value),
    Error(Value),
}

/// Engine living in another process (any language). One process per case, so
/// no state can leak between cases.
#[derive(Debug, Clone)]
pub struct ExternalEngine {
    pub name: String,
    pub command: PathBuf,
    pub args: Vec<String>,
    /// `None` waits forever; a hung engine then blocks the run.
    pub timeout: Option<Duration>,
}

impl ExternalEngine {
    /// Resolve the command on `PATH` (or as a path) and fail if it cannot be found.
    pub fn new(
        name: impl Into<String>,
        command: impl Into<PathBuf>,
        args: Vec<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let name = name.into();
        let command = command.into();
        let resolved = which::which(&command).map_err(|e| HarnessError::EngineUnavailable {
            name: name.clone(),
            reason: format!("'{}' not found or not executable: {e}", command.display()),
        })?;
        debug!(engine = %name, command = %resolved.display(), "resolved external engine");
        Ok(Self {
            name,
            command: resolved,
            args,
            timeout,
        })
    }

    fn invoke(&self, rule: &Value, data: &Value) -> std::result::Result<Value, EngineFailure> {
        let request = json!({ "rule": rule, "data": data }).to_string();

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                EngineFailure::untyped(
                    "ProcessError",
                    format!("failed to start '{}': {e}", self.command.display()),
                )
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineFailure::untyped("ProcessError", "missing stdin"))?;
        let name = self.name.clone();
        // Fed from a thread so a large request cannot wedge against an engine that is still writing.
        thread::spawn(move || {
            // An engine may exit before reading everything; its reply decides the outcome.
            if let Err(e) = stdin.write_all(request.as_bytes()) {
                debug!(engine = %name, error = %e, "engine closed stdin early");
            }
        });

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match self.timeout {
            Some(timeout) => match child.wait_timeout(timeout) {
                Ok(Some(status)) => status,
                Ok(None) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(EngineFailure::untyped(
                        "Timeout",
                        format!("no reply after {} s", timeout.as_secs()),
                    ));
                }
                Err(e) => return Err(EngineFailure::untyped("ProcessError", e.to_string())),
            },
            None => child
                .wait()
                .map_err(|e| EngineFailure::untyped("ProcessError", e.to_string()))?,
        };

        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            return Err(EngineFailure::untyped(
                "ProcessError",
                format!(
                    "engine exited with {status}: {}",
                    String::from_utf8_lossy(&stderr).trim()
                ),
            ));
        }

        match serde_json::from_slice::<Response>(&stdout) {
            Ok(Response::Result(value)) => Ok(value),
            Ok(Response::Error(descriptor)) => Err(EngineFailure::from_descriptor(&descriptor)),
            Err(e) => Err(EngineFailure::untyped(
                "ProtocolError",
                format!(
                    "unreadable reply ({e}): {}",
                    String::from_utf8_lossy(&stdout).trim()
                ),
            )),
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

impl Engine for ExternalEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, rule: &Value, data: &Value) -> Outcome {
        self.invoke(rule, data).into()
    }
}
