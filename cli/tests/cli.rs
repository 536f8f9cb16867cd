//! Integration tests for the mortar command line

mod common;

use assert_cmd::Command;
use common::Workspace;
use predicates::prelude::*;

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("mortar")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compose"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("alias"));
}

#[test]
fn test_alias_add_requires_both_alias_and_spec() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["alias", "add", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_compose_prints_summary() {
    let ws = Workspace::new();
    ws.write(
        "app.toml",
        r#"
        [server]
        host = "127.0.0.1"
        port = 8080
        cache = "mortar/memory"

        [register]
        plugins = ["./plugins/hello", "mortar/status"]
        "#,
    );

    ws.cmd()
        .args(["compose", "app.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Server: 127.0.0.1:8080"))
        .stdout(predicate::str::contains("Plugins (2):"))
        .stdout(predicate::str::contains("hello 1.0.0"))
        .stdout(predicate::str::contains("/hello"))
        .stdout(predicate::str::contains("/status"))
        .stdout(predicate::str::contains("_default (memory)"));
}

#[test]
fn test_compose_json_output() {
    let ws = Workspace::new();
    ws.write(
        "app.json",
        r#"{
            "server": { "port": 3000 },
            "register": {
                "plugins": ["./plugins/hello"],
                "options": { "routes": { "prefix": "/v1" } }
            }
        }"#,
    );

    let output = ws.cmd().args(["compose", "app.json", "--json"]).output().unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["server"]["port"], 3000);
    assert_eq!(summary["plugins"][0]["name"], "hello");
    assert_eq!(summary["routes"][0]["path"], "/v1/hello");
    assert_eq!(summary["caches"], serde_json::json!([]));
}

#[test]
fn test_compose_invalid_manifest() {
    let ws = Workspace::new();
    ws.write("bad.json", r#"{ "connections": [] }"#);

    ws.cmd()
        .args(["compose", "bad.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid manifest"))
        .stderr(predicate::str::contains("bad.json"));
}

#[test]
fn test_compose_unresolvable_plugin() {
    let ws = Workspace::new();
    ws.write("app.toml", "[register]\nplugins = [\"./plugins/missing\"]\n");

    ws.cmd()
        .args(["compose", "app.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not resolve a module"))
        .stderr(predicate::str::contains("plugins/missing"));
}

#[test]
fn test_compose_missing_manifest_file() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["compose", "nope.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read manifest"));
}

#[test]
fn test_alias_add_list_remove() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["alias", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No aliases registered."));

    let canonical = ws.path("plugins/hello.toml").canonicalize().unwrap();
    ws.cmd()
        .args(["alias", "add", "greeter", "./plugins/hello.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains(common::display(&canonical)));

    ws.cmd()
        .args(["alias", "add", "stats", "mortar/status"])
        .assert()
        .success();

    ws.cmd()
        .args(["alias", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("greeter →"))
        .stdout(predicate::str::contains("stats → mortar/status"));

    let saved = std::fs::read_to_string(ws.config_file()).unwrap();
    assert!(saved.contains("[aliases]"));

    ws.cmd()
        .args(["alias", "remove", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed alias: stats"));

    ws.cmd()
        .args(["alias", "remove", "stats"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_alias_reserved_name() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["alias", "add", "compose", "mortar/status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is reserved"));
}

#[test]
fn test_alias_circular_reference_rejected() {
    let ws = Workspace::new();
    ws.cmd().args(["alias", "add", "a", "b"]).assert().success();
    ws.cmd()
        .args(["alias", "add", "b", "a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Circular alias"));
}

#[test]
fn test_compose_through_alias() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["alias", "add", "greeter", "./plugins/hello.toml"])
        .assert()
        .success();

    // The manifest lives elsewhere; the alias was stored as an absolute path
    ws.write("deploy/app.toml", "[register]\nplugins = [\"greeter\"]\n");

    ws.cmd()
        .args(["compose", "deploy/app.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Plugins (1):"))
        .stdout(predicate::str::contains("hello 1.0.0"));
}

#[test]
fn test_invalid_config_is_reported() {
    let ws = Workspace::new();
    std::fs::write(ws.config_file(), "[aliases]\na = \"b\"\nb = \"a\"\n").unwrap();

    ws.cmd()
        .args(["alias", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config validation failed"));
}
