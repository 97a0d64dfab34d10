//! CLI integration tests
//!
//! Tests that don't require a running API

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A port nothing listens on
const DEAD_API: &str = "http://127.0.0.1:9";

/// Get a command for the punchline binary with an isolated config directory
fn punchline(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("punchline").unwrap();
    cmd.env("PUNCHLINE_HOME", home.path())
        .env_remove("PUNCHLINE_API_URL")
        .env_remove("PUNCHLINE_LOG")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_help() {
    let home = TempDir::new().unwrap();
    punchline(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("comedy show listings"))
        .stdout(predicate::str::contains("revise"))
        .stdout(predicate::str::contains("endpoints"));
}

#[test]
fn test_version() {
    let home = TempDir::new().unwrap();
    punchline(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("punchline"));
}

#[test]
fn test_events_help() {
    let home = TempDir::new().unwrap();
    punchline(&home)
        .args(["events", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--host"))
        .stdout(predicate::str::contains("--venue"))
        .stdout(predicate::str::contains("--date"));
}

#[test]
fn test_call_help() {
    let home = TempDir::new().unwrap();
    punchline(&home)
        .args(["call", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("KEY=VALUE"))
        .stdout(predicate::str::contains("--body"));
}

#[test]
fn test_config_path() {
    let home = TempDir::new().unwrap();
    punchline(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"))
        .stdout(predicate::str::contains("Exists: no"));
}

#[test]
fn test_config_init_then_show() {
    let home = TempDir::new().unwrap();
    punchline(&home)
        .args(["config", "init", "https://api.example.com"])
        .assert()
        .success();

    punchline(&home)
        .args(["-o", "json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"base_url\": \"https://api.example.com\""));
}

#[test]
fn test_config_set_validates() {
    let home = TempDir::new().unwrap();
    punchline(&home)
        .args(["config", "set", "cache.keep_unused_for", "whenever"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid duration"));
}

#[test]
fn test_endpoints_needs_no_api() {
    let home = TempDir::new().unwrap();
    punchline(&home)
        .arg("endpoints")
        .assert()
        .success()
        .stdout(predicate::str::contains("findOneHost"))
        .stdout(predicate::str::contains("invalidates Host:{host_uid}"));
}

#[test]
fn test_endpoints_json() {
    let home = TempDir::new().unwrap();
    punchline(&home)
        .args(["endpoints", "--output", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"markEventAsRevised\""))
        .stdout(predicate::str::contains("\"method\": \"PATCH\""));
}

#[test]
fn test_missing_api_url() {
    let home = TempDir::new().unwrap();
    punchline(&home)
        .arg("hosts")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("API URL not configured"));
}

#[test]
fn test_unreachable_api() {
    let home = TempDir::new().unwrap();
    punchline(&home)
        .args(["--api-url", DEAD_API, "hosts"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Transport error"));
}

#[test]
fn test_api_url_from_env() {
    let home = TempDir::new().unwrap();
    punchline(&home)
        .env("PUNCHLINE_API_URL", DEAD_API)
        .args(["event", "e1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("API URL not configured").not());
}

#[test]
fn test_invalid_date() {
    let home = TempDir::new().unwrap();
    punchline(&home)
        .args(["--api-url", DEAD_API, "events", "--date", "someday"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid date"));
}

#[test]
fn test_open_unrecognized_link() {
    let home = TempDir::new().unwrap();
    punchline(&home)
        .args(["--api-url", DEAD_API, "open", "/settings/profile"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unrecognized link"));
}

#[test]
fn test_call_unknown_endpoint() {
    let home = TempDir::new().unwrap();
    punchline(&home)
        .args(["--api-url", DEAD_API, "call", "findEverything"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("findEverything"));
}

#[test]
fn test_call_rejects_malformed_param() {
    let home = TempDir::new().unwrap();
    punchline(&home)
        .args(["call", "findOneHost", "-p", "host_uid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("KEY=VALUE"));
}

#[test]
fn test_revise_rejects_json() {
    let home = TempDir::new().unwrap();
    punchline(&home)
        .args(["--api-url", DEAD_API, "-o", "json", "revise"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("interactive"));
}

#[test]
fn test_verbose_conflicts_with_quiet() {
    let home = TempDir::new().unwrap();
    punchline(&home)
        .args(["-v", "--quiet", "endpoints"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_invalid_command() {
    let home = TempDir::new().unwrap();
    punchline(&home)
        .arg("heckle")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_completions() {
    let home = TempDir::new().unwrap();
    punchline(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("punchline"));
}

#[test]
fn test_aliases() {
    let home = TempDir::new().unwrap();
    punchline(&home)
        .args(["e", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--room"));
}
