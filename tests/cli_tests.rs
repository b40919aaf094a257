//! Integration tests for the shortflow CLI
//!
//! These run the actual binary and verify output.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn shortflow_cmd() -> Command {
    Command::cargo_bin("shortflow").unwrap()
}

/// A workflow touching every step kind: plain, branch, merge
const FAN_OUT_WORKFLOW: &str = r#"{
    "id": "wf-digest",
    "name": "Digest",
    "steps": [
        {"name": "Fetch", "shortcutName": "Fetch Mail"},
        {"branches": [
            [{"name": "Summarize", "shortcutName": "Summarize Text"}],
            [{"name": "Extract", "shortcutName": "Extract Tasks"}]
        ]},
        {"name": "Combine", "shortcutName": "Combine Notes", "branchStepIndex": 1}
    ]
}"#;

#[test]
fn help_flag() {
    shortflow_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Pipeline engine for Shortcuts automation workflows",
        ));
}

#[test]
fn run_help_lists_executor_flag() {
    shortflow_cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--executor"))
        .stdout(predicate::str::contains("--sse"));
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn validate_accepts_a_well_formed_workflow() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("digest.json");
    fs::write(&file, FAN_OUT_WORKFLOW).unwrap();

    shortflow_cmd()
        .args(["validate", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"))
        .stdout(predicate::str::contains("Steps: 3"))
        .stdout(predicate::str::contains("Leaf steps: 4"));
}

#[test]
fn validate_rejects_a_bad_merge_reference() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("broken.json");
    fs::write(
        &file,
        r#"{
            "id": "wf-broken",
            "name": "Broken",
            "steps": [
                {"name": "Only", "shortcutName": "Only"},
                {"name": "Combine", "shortcutName": "Combine", "branchStepIndex": 0}
            ]
        }"#,
    )
    .unwrap();

    shortflow_cmd()
        .args(["validate", file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a branch step"))
        .stderr(predicate::str::contains("Fix:"));
}

#[test]
fn validate_rejects_malformed_json() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("garbage.json");
    fs::write(&file, "{ not json").unwrap();

    shortflow_cmd()
        .args(["validate", file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

// ============================================================================
// Running
// ============================================================================

#[test]
fn run_with_mock_executor_completes() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("digest.json");
    fs::write(&file, FAN_OUT_WORKFLOW).unwrap();

    shortflow_cmd()
        .args([
            "run",
            file.to_str().unwrap(),
            "--executor",
            "mock",
            "--input",
            "hello",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Running 'Digest' (4 steps)"))
        .stdout(predicate::str::contains("Done!"));
}

#[test]
fn run_with_sse_flag_prints_frames() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("digest.json");
    fs::write(&file, FAN_OUT_WORKFLOW).unwrap();

    shortflow_cmd()
        .args(["run", file.to_str().unwrap(), "--executor", "mock", "--sse"])
        .assert()
        .success()
        .stdout(predicate::str::contains("data: {"))
        .stdout(predicate::str::contains(r#""status":"running""#))
        .stdout(predicate::str::contains(r#""status":"completed""#));
}

#[test]
fn run_shortcut_prints_the_output() {
    shortflow_cmd()
        .args(["run-shortcut", "Summarize Text", "--executor", "mock"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Mock output"));
}

#[test]
fn run_rejects_unknown_executor() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("digest.json");
    fs::write(&file, FAN_OUT_WORKFLOW).unwrap();

    shortflow_cmd()
        .args(["run", file.to_str().unwrap(), "--executor", "telepathy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown executor"));
}

#[test]
fn run_missing_file_fails_cleanly() {
    shortflow_cmd()
        .args(["run", "does-not-exist.json", "--executor", "mock"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}
