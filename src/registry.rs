use crate::backend::{Engine, ExternalEngine};
use crate::config::EnginesConfig;
use crate::error::{HarnessError, Result};
use indexmap::IndexMap;

pub type EngineFactory = Box<dyn Fn() -> Result<Box<dyn Engine>>>;

/// Name → adapter constructor. Lookup is by exact name and fails closed.
#[derive(Default)]
pub struct EngineRegistry {
    factories: IndexMap<String, EngineFactory>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one external-process factory per `engines.yaml` entry.
    pub fn from_config(cfg: &EnginesConfig) -> Self {
        let mut registry = Self::new();
        for (name, entry) in &cfg.engines {
            let name = name.clone();
            let command = cfg.command_path(entry);
            let args = entry.args.clone();
            let timeout = entry.timeout();
            registry.register(name.clone(), move || {
                let engine = ExternalEngine::new(name.clone(), command.clone(), args.clone(), timeout)?;
                Ok(Box::new(engine) as Box<dyn Engine>)
            });
        }
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn Engine>> + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Construct a fresh adapter. `UnknownEngine` for unregistered names,
    /// `EngineUnavailable` when the adapter's dependency is missing.
    pub fn resolve(&self, name: &str) -> Result<Box<dyn Engine>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| HarnessError::UnknownEngine(name.to_string()))?;
        factory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{EngineFailure, FnEngine, Outcome};
    use serde_json::{json, Value};

    fn identity() -> Result<Box<dyn Engine>> {
        Ok(Box::new(FnEngine::new(
            "identity",
            |rule: &Value, _: &Value| -> std::result::Result<Value, EngineFailure> {
                Ok(rule.clone())
            },
        )))
    }

    #[test]
    fn resolves_registered_engine() {
        let mut registry = EngineRegistry::new();
        registry.register("identity", identity);
        let engine = registry.resolve("identity").unwrap();
        assert_eq!(engine.name(), "identity");
        assert_eq!(
            engine.evaluate(&json!(5), &Value::Null),
            Outcome::Value(json!(5))
        );
    }

    #[test]
    fn unknown_name_fails_closed() {
        let mut registry = EngineRegistry::new();
        registry.register("identity", identity);
        assert!(matches!(
            registry.resolve("Identity"),
            Err(HarnessError::UnknownEngine(name)) if name == "Identity"
        ));
    }

    #[test]
    fn missing_external_binary_is_unavailable_not_unknown() {
        let cfg = EnginesConfig::from_yaml(
            "Engines:\n  ghost:\n    Command: no-such-jsonlogic-binary-xyz\n",
        )
        .unwrap();
        let registry = EngineRegistry::from_config(&cfg);
        assert!(registry.contains("ghost"));
        assert!(matches!(
            registry.resolve("ghost"),
            Err(HarnessError::EngineUnavailable { .. })
        ));
    }
}
