use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use serde_json::{json, Value};
use std::fs;
use tempfile::tempdir;

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("jsonlogic-compat").unwrap();
    cmd.env_remove("LIBRARY").env_remove("RUST_LOG").arg("--no-color");
    cmd
}

#[test]
fn missing_index_exits_non_zero() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("engines.yaml"),
        "Engines:\n  sh-engine:\n    Command: sh\n",
    )
    .unwrap();

    bin()
        .current_dir(dir.path())
        .args(["run", "--engine", "sh-engine"])
        .assert()
        .failure()
        .stderr(contains("suite index not found"))
        .stdout(contains("Running suite").not());

    assert!(!dir.path().join("results").exists());
}

#[test]
fn unknown_engine_exits_non_zero() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("engines.yaml"), "Engines: {}\n").unwrap();

    bin()
        .current_dir(dir.path())
        .env("LIBRARY", "shiny_json_logic")
        .arg("run")
        .assert()
        .failure()
        .stderr(contains("unknown engine: shiny_json_logic"));
}

#[cfg(unix)]
#[test]
fn run_against_external_engine_then_report() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("suites")).unwrap();
    fs::write(root.join("suites/index.json"), r#"["truthy.json"]"#).unwrap();
    let cases: Value = json!([
        "# always true",
        {"description": "one", "rule": {"==": [1, 1]}, "data": null, "result": true},
        {"description": "two", "rule": {"!": [true]}, "data": null, "result": false}
    ]);
    fs::write(root.join("suites/truthy.json"), cases.to_string()).unwrap();

    let engine = root.join("always-true.sh");
    fs::write(&engine, "#!/bin/sh\ncat >/dev/null\necho '{\"result\": true}'\n").unwrap();
    fs::set_permissions(&engine, fs::Permissions::from_mode(0o755)).unwrap();
    fs::write(
        root.join("engines.yaml"),
        "Engines:\n  always-true:\n    Command: ./always-true.sh\n",
    )
    .unwrap();

    bin()
        .current_dir(root)
        .args(["run", "-e", "always-true"])
        .assert()
        .success()
        .stdout(contains("Running test 1: one"))
        .stdout(contains("Test 2 failed. Expected false, got true"))
        .stdout(contains("Results: 1/2 passed (50.00%)"))
        .stdout(contains("Results saved to results/rust.json"));

    let saved: Value =
        serde_json::from_str(&fs::read_to_string(root.join("results/rust.json")).unwrap()).unwrap();
    assert_eq!(saved["totals"]["always-true"], json!({"passed": 1, "total": 2}));
    assert_eq!(
        saved["test_suites"]["truthy.json"]["always-true"],
        json!({"passed": 1, "total": 2})
    );

    bin()
        .current_dir(root)
        .arg("report")
        .assert()
        .success()
        .stdout(contains("| truthy.json | 2 | 1 |"))
        .stdout(contains("| **Success rate** |  | 50.00% |"))
        .stdout(contains("Generated: "));
}
