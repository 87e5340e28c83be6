use crate::error::{HarnessError, Result};
use crate::types::{SuiteEntry, TestSuite};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const INDEX_FILE: &str = "index.json";

/// Load every suite listed in `<suites_dir>/index.json`, in index order.
///
/// All or nothing: the first missing or unparsable file aborts the load, so a
/// broken suite can never silently shrink coverage.
pub fn load_suites(suites_dir: &Path) -> Result<Vec<TestSuite>> {
    let names = load_index(&suites_dir.join(INDEX_FILE))?;
    names
        .iter()
        .map(|name| load_suite_file(suites_dir, name))
        .collect()
}

/// Parse the index: a JSON array of suite file names relative to the suites directory.
pub fn load_index(path: &Path) -> Result<Vec<String>> {
    let content = read(path, || HarnessError::MissingIndex {
        path: path.to_path_buf(),
    })?;
    serde_json::from_str(&content).map_err(|source| HarnessError::MalformedIndex {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_suite_file(suites_dir: &Path, name: &str) -> Result<TestSuite> {
    let path = suites_dir.join(name);
    let content = read(&path, || HarnessError::MissingSuite { path: path.clone() })?;
    let raw: Vec<Value> =
        serde_json::from_str(&content).map_err(|source| HarnessError::MalformedSuite {
            path: path.clone(),
            source,
        })?;
    let entries: Vec<SuiteEntry> = raw
        .into_iter()
        .enumerate()
        .map(|(idx, value)| SuiteEntry::from_value(name, idx, value))
        .collect();
    debug!(
        suite = name,
        entries = entries.len(),
        cases = entries.iter().filter(|e| e.as_case().is_some()).count(),
        "loaded suite"
    );
    Ok(TestSuite {
        name: name.to_string(),
        entries,
    })
}

fn read(path: &Path, missing: impl FnOnce() -> HarnessError) -> Result<String> {
    fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => missing(),
        _ => HarnessError::Read {
            path: PathBuf::from(path),
            source,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_index_is_reported() {
        let dir = tempdir().unwrap();
        let err = load_suites(dir.path()).unwrap_err();
        assert!(matches!(err, HarnessError::MissingIndex { .. }));
    }

    #[test]
    fn malformed_index_is_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(INDEX_FILE), "[\"a.json\",").unwrap();
        let err = load_suites(dir.path()).unwrap_err();
        assert!(matches!(err, HarnessError::MalformedIndex { .. }));
    }

    #[test]
    fn one_missing_suite_aborts_the_whole_load() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(INDEX_FILE), r#"["a.json", "b.json"]"#).unwrap();
        fs::write(dir.path().join("a.json"), "[]").unwrap();
        match load_suites(dir.path()).unwrap_err() {
            HarnessError::MissingSuite { path } => assert!(path.ends_with("b.json")),
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn malformed_suite_names_the_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(INDEX_FILE), r#"["a.json"]"#).unwrap();
        fs::write(dir.path().join("a.json"), "{not json").unwrap();
        let err = load_suites(dir.path()).unwrap_err();
        assert!(err.to_string().contains("a.json"));
        assert!(matches!(err, HarnessError::MalformedSuite { .. }));
    }

    #[test]
    fn suites_keep_index_order_and_skip_comments() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(INDEX_FILE), r#"["z.json", "a.json"]"#).unwrap();
        fs::write(
            dir.path().join("z.json"),
            r##"["# comparisons", {"rule": {"==": [1, 1]}, "data": null, "result": true}]"##,
        )
        .unwrap();
        fs::write(dir.path().join("a.json"), "[]").unwrap();
        let suites = load_suites(dir.path()).unwrap();
        let names: Vec<&str> = suites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["z.json", "a.json"]);
        assert_eq!(suites[0].entries.len(), 2);
        assert_eq!(suites[0].cases().count(), 1);
    }
}
