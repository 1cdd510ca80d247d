//! Integration tests for the antimon binary.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const OPENAI_KEY: &str = "sk-aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

/// A command isolated from the user's environment: temporary HOME and
/// working directory, no antimon variables.
fn cmd(home: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("antimon");
    cmd.env("HOME", home.path())
        .current_dir(home.path())
        .env_remove("ANTIMON_CONFIG")
        .env_remove("ANTIMON_IGNORE_PATTERNS")
        .env_remove("ANTIMON_ALLOW_FILES")
        .env_remove("ANTIMON_DISABLE_DETECTORS")
        .env_remove("RUST_LOG");
    cmd
}

/// Helper to create a config file.
fn create_config(dir: &TempDir, content: &str) -> PathBuf {
    let config_path = dir.path().join("custom.toml");
    fs::write(&config_path, content).unwrap();
    config_path
}

fn write_input(path: &str, content: &str) -> String {
    serde_json::json!({
        "hook_event_name": "PreToolUse",
        "tool_name": "Write",
        "tool_input": {"file_path": path, "content": content}
    })
    .to_string()
}

#[test]
fn test_block_passwd_write() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .write_stdin(write_input("/etc/passwd", "x"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Security issues detected"))
        .stderr(predicate::str::contains("/etc/passwd"));
}

#[test]
fn test_allow_clean_write() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .write_stdin(write_input("hello.py", "print('hi')"))
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_invalid_json_exits_one() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .write_stdin("this is not json")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to parse JSON"));
}

#[test]
fn test_missing_field_wins_over_detection() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .write_stdin(r#"{"tool_name":"Write","tool_input":{"file_path":"/etc/passwd"}}"#)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Missing required field 'content'"));
}

#[test]
fn test_missing_command_and_file_path() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .write_stdin(r#"{"tool_name":"Bash","tool_input":{}}"#)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("'command'"));
    cmd(&home)
        .write_stdin(r#"{"tool_name":"Read","tool_input":{}}"#)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("'file_path'"));
}

#[test]
fn test_dry_run_reports_but_allows() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .arg("--dry-run")
        .write_stdin(write_input("/etc/passwd", "x"))
        .assert()
        .success()
        .stderr(predicate::str::contains("DRY RUN"))
        .stderr(predicate::str::contains("/etc/passwd"));
}

#[test]
fn test_disable_detector_flag_and_env() {
    let home = TempDir::new().unwrap();
    let input = write_input("app.py", "import openai");

    cmd(&home).write_stdin(input.clone()).assert().code(2);
    cmd(&home)
        .args(["--disable-detector", "llm_api"])
        .write_stdin(input.clone())
        .assert()
        .success();
    cmd(&home)
        .env("ANTIMON_DISABLE_DETECTORS", "detect_llm_api, localhost")
        .write_stdin(input)
        .assert()
        .success();
}

#[test]
fn test_allow_file_keeps_content_checks() {
    let home = TempDir::new().unwrap();

    cmd(&home)
        .args(["--allow-file", "config/**/*.env"])
        .write_stdin(write_input("config/prod/app.env", "DEBUG=1"))
        .assert()
        .success();

    cmd(&home)
        .args(["--allow-file", "config.py"])
        .write_stdin(write_input("config.py", &format!("api_key = \"{OPENAI_KEY}\"")))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("API key"))
        .stderr(predicate::str::contains(OPENAI_KEY).not());
}

#[test]
fn test_ignore_pattern_env() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .env("ANTIMON_IGNORE_PATTERNS", "*.py,docs/*")
        .write_stdin(write_input("config.py", &format!("api_key = \"{OPENAI_KEY}\"")))
        .assert()
        .success();
}

#[test]
fn test_json_report() {
    let home = TempDir::new().unwrap();
    let output = cmd(&home)
        .arg("--json")
        .write_stdin(write_input("/etc/passwd", "x"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["has_issues"], true);
    assert_eq!(report["exit_code"], 2);
    assert_eq!(report["stats"]["total"], 6);
}

#[test]
fn test_stats_flag() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .arg("--stats")
        .write_stdin(write_input("hello.py", "print('hi')"))
        .assert()
        .success()
        .stderr(predicate::str::contains("Detectors run: 6"));
}

#[test]
fn test_configured_rule_blocks() {
    let home = TempDir::new().unwrap();
    let config = create_config(
        &home,
        r#"
[patterns.company_secrets]
content_patterns = ['COMPANY_SECRET_[A-Z0-9]+', '([broken']
message = "Company secret detected"
"#,
    );

    cmd(&home)
        .env("ANTIMON_CONFIG", &config)
        .write_stdin(write_input("app.py", "token = COMPANY_SECRET_XYZ"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Company secret detected"));

    cmd(&home)
        .arg("--config")
        .arg(&config)
        .write_stdin(write_input("app.py", "print('hi')"))
        .assert()
        .success();
}

#[test]
fn test_discovered_config_file() {
    let home = TempDir::new().unwrap();
    let project = home.path().join("project");
    fs::create_dir_all(project.join("src")).unwrap();
    fs::write(
        project.join("antimon.toml"),
        "[patterns.todo]\ncontent_patterns = ['DO_NOT_SHIP']\nmessage = \"Unshippable marker\"\n",
    )
    .unwrap();

    cmd(&home)
        .current_dir(project.join("src"))
        .write_stdin(write_input("main.rs", "// DO_NOT_SHIP"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unshippable marker"));
}

#[test]
fn test_broken_config_falls_back() {
    let home = TempDir::new().unwrap();
    let config = create_config(&home, "[patterns\nthis is not toml");

    cmd(&home)
        .env("ANTIMON_CONFIG", &config)
        .write_stdin(write_input("hello.py", "print('hi')"))
        .assert()
        .success();
    cmd(&home)
        .env("ANTIMON_CONFIG", home.path().join("missing.toml"))
        .write_stdin(write_input("/etc/passwd", "x"))
        .assert()
        .code(2);
}

#[test]
fn test_audit_log() {
    let home = TempDir::new().unwrap();
    let config = create_config(&home, "[audit]\nenabled = true\npath = \"logs/audit.jsonl\"\n");

    cmd(&home)
        .env("ANTIMON_CONFIG", &config)
        .write_stdin(write_input("/etc/passwd", "x"))
        .assert()
        .code(2);

    let log = fs::read_to_string(home.path().join("logs/audit.jsonl")).unwrap();
    let entry: serde_json::Value = serde_json::from_str(log.lines().next().unwrap()).unwrap();
    assert_eq!(entry["event_type"], "block");
    assert_eq!(entry["tool_name"], "Write");
    assert_eq!(entry["file_path"], "/etc/passwd");
}

#[test]
fn test_explain_last_error() {
    let home = TempDir::new().unwrap();

    cmd(&home)
        .arg("--explain-last-error")
        .assert()
        .success()
        .stdout(predicate::str::contains("No blocked operation"));

    cmd(&home)
        .write_stdin(r#"{"tool_name":"Read","tool_input":{"file_path":"/etc/shadow"}}"#)
        .assert()
        .code(2);
    assert!(home.path().join(".antimon/last_error.json").exists());

    cmd(&home)
        .arg("--explain-last-error")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tool: Read"))
        .stdout(predicate::str::contains("/etc/shadow"));
}

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_check_files_worst_code() {
    let home = TempDir::new().unwrap();
    let clean = write_file(home.path(), "clean.py", "print('hi')");
    let dirty = write_file(home.path(), "dirty.py", "import anthropic");

    cmd(&home)
        .arg("--check-file")
        .arg(&clean)
        .assert()
        .success();

    cmd(&home)
        .arg("--check-file")
        .arg(&clean)
        .arg("--check-file")
        .arg(&dirty)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("dirty.py:"));

    cmd(&home)
        .arg("--check-file")
        .arg(home.path().join("missing.py"))
        .arg("--check-file")
        .arg(&clean)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn test_check_files_json_is_one_array() {
    let home = TempDir::new().unwrap();
    let clean = write_file(home.path(), "clean.py", "print('hi')");
    let dirty = write_file(home.path(), "dirty.py", "import anthropic");

    let output = cmd(&home)
        .arg("--json")
        .arg("--check-file")
        .arg(&clean)
        .arg("--check-file")
        .arg(&dirty)
        .arg("--check-file")
        .arg(home.path().join("missing.py"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let reports = reports.as_array().unwrap();
    assert_eq!(reports.len(), 3);
    assert!(reports[0]["file"].as_str().unwrap().ends_with("clean.py"));
    assert_eq!(reports[0]["exit_code"], 0);
    assert_eq!(reports[1]["exit_code"], 2);
    assert_eq!(reports[2]["exit_code"], 1);
    assert!(reports[2]["error"].as_str().unwrap().contains("failed to read"));
}

#[test]
fn test_null_content_is_invalid_input() {
    let home = TempDir::new().unwrap();
    let input = serde_json::json!({
        "tool_name": "Write",
        "tool_input": {"file_path": "app.py", "content": null}
    });
    cmd(&home)
        .write_stdin(input.to_string())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("content"));
}

#[test]
fn test_status_shows_policy_and_config() {
    let home = TempDir::new().unwrap();
    let config = create_config(&home, "[patterns.vault]\nfile_patterns = ['\\.vault$']\n");

    cmd(&home)
        .arg("--status")
        .arg("--config")
        .arg(&config)
        .arg("--allow-file")
        .arg("fixtures/.env")
        .env("ANTIMON_DISABLE_DETECTORS", "docker")
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("disabled  docker"))
        .stdout(predicate::str::contains("Allowed files: fixtures/.env"))
        .stdout(predicate::str::contains("custom.toml"))
        .stdout(predicate::str::contains("Rule: vault"));

    cmd(&home)
        .arg("--status")
        .assert()
        .success()
        .stdout(predicate::str::contains("(none)"))
        .stdout(predicate::str::contains("configured rules inactive"));
}

#[test]
fn test_self_test_passes() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .arg("--self-test")
        .assert()
        .success()
        .stdout(predicate::str::contains("Test 1: Sensitive file detection ... PASS"))
        .stdout(predicate::str::contains("10/10 tests passed"));

    // Overrides do not affect the built-in case table.
    cmd(&home)
        .arg("--self-test")
        .env("ANTIMON_DISABLE_DETECTORS", "docker,api_key")
        .assert()
        .success();

    assert!(!home.path().join(".antimon/last_error.json").exists());
}
