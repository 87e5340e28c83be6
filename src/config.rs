use crate::error::{HarnessError, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One external engine entry of `engines.yaml`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct EngineCfg {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Seconds per case.
    pub timeout: Option<u64>,
}

impl EngineCfg {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct EnginesConfig {
    #[serde(alias = "Engines", default)]
    pub engines: IndexMap<String, EngineCfg>,
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl EnginesConfig {
    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| HarnessError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cfg = Self::from_yaml(&content).map_err(|e| HarnessError::InvalidConfig {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        cfg.base_dir = path.parent().map(Path::to_path_buf);
        Ok(cfg)
    }

    /// Command path for an entry. Bare names stay bare (looked up on `PATH`);
    /// relative paths are taken relative to the config file.
    pub fn command_path(&self, entry: &EngineCfg) -> PathBuf {
        let command = Path::new(entry.command.trim());
        let is_bare = command.components().count() == 1;
        match &self.base_dir {
            Some(base) if !is_bare && command.is_relative() => base.join(command),
            _ => command.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pascal_case_entries() {
        let yaml = r#"
Engines:
  datalogic-rs:
    Command: datalogic-cli
    Args: ["--stdin"]
    Timeout: 30
  json-logic-js:
    Command: ./adapters/node-json-logic.js
"#;
        let cfg = EnginesConfig::from_yaml(yaml).unwrap();
        assert_eq!(cfg.engines.len(), 2);
        let first = &cfg.engines["datalogic-rs"];
        assert_eq!(first.args, ["--stdin"]);
        assert_eq!(first.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.engines["json-logic-js"].timeout(), None);
    }

    #[test]
    fn relative_commands_resolve_against_config_dir() {
        let mut cfg = EnginesConfig::from_yaml(
            "Engines:\n  a:\n    Command: ./bin/a\n  b:\n    Command: b-cli\n",
        )
        .unwrap();
        cfg.base_dir = Some(PathBuf::from("/etc/compat"));
        assert_eq!(
            cfg.command_path(&cfg.engines["a"]),
            PathBuf::from("/etc/compat/./bin/a")
        );
        assert_eq!(cfg.command_path(&cfg.engines["b"]), PathBuf::from("b-cli"));
    }
}
