//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run against the dev data directory
//! and verify exit codes and output shapes.

use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-p", "windward-cli", "--"])
        .args(args)
        .env("WINDWARD_ENV", "dev")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn test_config_list() {
    let (stdout, _, code) = run_cli(&["config", "list"]);
    assert_eq!(code, 0, "Config list failed");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(parsed["limit"]["daily_seconds"].is_number());
}

#[test]
fn test_config_get() {
    let (stdout, _, code) = run_cli(&["config", "get", "shield.cooldown_seconds"]);
    assert_eq!(code, 0, "Config get failed");
    assert!(!stdout.trim().is_empty());
}

#[test]
fn test_config_get_unknown_key_fails() {
    let (_, _, code) = run_cli(&["config", "get", "no.such.key"]);
    assert_ne!(code, 0);
}

#[test]
fn test_status() {
    let (stdout, _, code) = run_cli(&["status"]);
    assert_eq!(code, 0, "Status failed");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(parsed["wind"]["points"].is_number());
    assert!(parsed["shield"]["status"].is_string());
}

#[test]
fn test_shield_status() {
    let (stdout, _, code) = run_cli(&["shield", "status"]);
    assert_eq!(code, 0, "Shield status failed");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(parsed["isActive"].is_boolean());
}

#[test]
fn test_monitor_interval_start() {
    let (stdout, _, code) = run_cli(&["monitor", "interval-start"]);
    assert_eq!(code, 0, "Monitor interval-start failed");
    assert!(stdout.contains("newDay") || stdout.contains("restart"));
}

#[test]
fn test_monitor_malformed_event_is_dropped() {
    let (_, _, code) = run_cli(&["monitor", "event", "not_a_threshold"]);
    assert_eq!(code, 0, "Malformed events must not fail the monitor");
}

#[test]
fn test_log_list() {
    let (stdout, _, code) = run_cli(&["log", "list"]);
    assert_eq!(code, 0, "Log list failed");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(parsed["records"].is_array());
}

#[test]
fn test_break_status() {
    let (stdout, _, code) = run_cli(&["break", "status"]);
    assert_eq!(code, 0, "Break status failed");
    assert!(!stdout.trim().is_empty());
}

#[test]
fn test_break_start_rejects_unknown_kind() {
    let (_, stderr, code) = run_cli(&["break", "start", "--kind", "bogus"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown break kind"));
}
