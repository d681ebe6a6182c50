//! CLI integration tests

use std::process::Command;

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "cospeck-cli", "--", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Benchmark harness for CRI container runtimes"),
        "Should show app description"
    );
    assert!(stdout.contains("test"), "Should show test command");
    assert!(stdout.contains("node-buster"), "Should show node-buster command");
    assert!(stdout.contains("info"), "Should show info command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = Command::new("cargo")
        .args(["run", "-p", "cospeck-cli", "--", "--version"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("cospeck"), "Should show binary name");
}

/// Test the general test subcommand help
#[test]
fn test_test_command_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "cospeck-cli", "--", "test", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "test help should succeed");
    assert!(stdout.contains("--pods"), "Should show pods option");
    assert!(
        stdout.contains("--settle-delay-ms"),
        "Should show settle delay option"
    );
}

/// Test that a missing pod manifest fails before any runtime call
#[test]
fn test_missing_pod_manifest_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("pod.yaml");

    let output = Command::new("cargo")
        .args(["run", "-p", "cospeck-cli", "--", "--pod-config"])
        .arg(&missing)
        .args(["--runtime-endpoint"])
        .arg(format!("unix://{}", dir.path().join("none.sock").display()))
        .args(["test", "--pods", "1"])
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Run without manifest should fail");
    assert!(stderr.contains("pod manifest"), "Should name the manifest");
}
