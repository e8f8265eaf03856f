//! CLI integration tests.
//!
//! These run the binary against configuration files only; nothing here
//! reaches a network.

use std::io::Write;
use std::process::{Command, Output};

const HUB_VARS: [&str; 7] = [
    "HUBBRIDGE_CONNECTOR",
    "HUBBRIDGE_URL",
    "HUBBRIDGE_AUTHORIZATION",
    "HUBBRIDGE_AUTH_HEADER",
    "HUBBRIDGE_TOKEN",
    "HUBBRIDGE_TRANSPORT",
    "HUBBRIDGE_TIMEOUT_SECS",
];

/// A command for the binary with hub variables cleared and the config
/// directory pointed at `home`.
fn hubbridge(home: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_hubbridge"));
    for var in HUB_VARS {
        cmd.env_remove(var);
    }
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &std::path::Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("config.json");
    let mut file = std::fs::File::create(&path).expect("Failed to create config");
    file.write_all(content.as_bytes())
        .expect("Failed to write config");
    path
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

const CONFIG: &str = r#"{
    // test hub
    "mcp": {
        "hub": {
            "url": "http://127.0.0.1:9/sse",
            "headers": { "Authorization": "Bearer super-secret-token", "X-Team": "infra" }
        }
    }
}"#;

#[test]
fn test_help_lists_subcommands() {
    let home = tempfile::tempdir().unwrap();
    let output = hubbridge(home.path()).arg("--help").output().unwrap();

    assert!(output.status.success());
    let out = stdout(&output);
    for subcommand in ["search", "describe", "call", "tools", "endpoint"] {
        assert!(out.contains(subcommand), "missing {subcommand}");
    }
    assert!(out.contains("--config"));
}

#[test]
fn test_version() {
    let home = tempfile::tempdir().unwrap();
    let output = hubbridge(home.path()).arg("--version").output().unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).contains("hubbridge"));
}

#[test]
fn test_tools_prints_schemas() {
    let home = tempfile::tempdir().unwrap();
    let output = hubbridge(home.path()).arg("tools").output().unwrap();

    assert!(output.status.success(), "{}", stderr(&output));
    let tools: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let ids: Vec<&str> = tools
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["hub_call", "hub_describe", "hub_search"]);
}

#[test]
fn test_endpoint_masks_credentials() {
    let home = tempfile::tempdir().unwrap();
    let config = write_config(home.path(), CONFIG);

    let output = hubbridge(home.path())
        .args(["endpoint", "--config"])
        .arg(&config)
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(!out.contains("super-secret-token"));

    let summary: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(summary["connector"], "hub");
    assert_eq!(summary["transport"], "sse");
    assert_eq!(summary["headers"]["X-Team"], "infra");
    assert_eq!(summary["headers"]["Authorization"], "Bear****");
}

#[test]
fn test_env_overrides_transport() {
    let home = tempfile::tempdir().unwrap();
    let config = write_config(home.path(), CONFIG);

    let output = hubbridge(home.path())
        .args(["endpoint", "--config"])
        .arg(&config)
        .env("HUBBRIDGE_TRANSPORT", "http")
        .output()
        .unwrap();

    let summary: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(summary["transport"], "streamable-http");
}

#[test]
fn test_missing_url_names_the_fix() {
    let home = tempfile::tempdir().unwrap();
    let output = hubbridge(home.path())
        .args(["search", "deploy"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("HUBBRIDGE_URL"), "{err}");
}

#[test]
fn test_missing_explicit_config() {
    let home = tempfile::tempdir().unwrap();
    let output = hubbridge(home.path())
        .args(["endpoint", "--config"])
        .arg(home.path().join("absent.json"))
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(stderr(&output).contains("config file not found"));
}

#[test]
fn test_invalid_call_arguments_fail_fast() {
    let home = tempfile::tempdir().unwrap();
    let config = write_config(home.path(), CONFIG);

    let output = hubbridge(home.path())
        .args(["call", "files.write", "[1,2]", "--config"])
        .arg(&config)
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(stderr(&output).contains("invalid arguments"));
}
