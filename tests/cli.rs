mod common;

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

use common::StubServer;

/// The binary, isolated from the caller's config, logs, and CI environment.
fn repokeeper(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("repokeeper").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir)
        .env_remove("RUST_LOG")
        .env_remove("GITHUB_OUTPUT")
        .env_remove("GITHUB_EVENT_PATH")
        .env_remove("REPOKEEPER_CONFIG")
        .env_remove("JIRA_EMAIL")
        .env_remove("JIRA_TOKEN")
        .env_remove("JIRA_SERVER")
        .arg("--no-log-file");
    cmd
}

#[test]
fn schema_describes_config_sections() {
    let dir = tempfile::tempdir().unwrap();
    repokeeper(dir.path())
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"commits\""))
        .stdout(predicate::str::contains("\"jira\""));
}

#[test]
fn toolchain_channel_exports_version_output() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("rust-toolchain.toml"),
        "[toolchain]\nchannel = \"1.75.0\"\ncomponents = [\"clippy\"]\n",
    )
    .unwrap();
    let output = dir.path().join("github_output");

    repokeeper(dir.path())
        .env("GITHUB_OUTPUT", &output)
        .args(["toolchain", "channel"])
        .assert()
        .success()
        .stdout("1.75.0\n");

    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(written, "version=1.75.0\n");
}

#[test]
fn toolchain_channel_without_github_output_still_prints() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("pinned.toml");
    std::fs::write(&file, "[toolchain]\nchannel = \"1.80.1\"\n").unwrap();

    repokeeper(dir.path())
        .args(["toolchain", "channel"])
        .arg(&file)
        .assert()
        .success()
        .stdout("1.80.1\n");
}

#[test]
fn named_channel_is_a_parse_failure() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("rust-toolchain.toml"),
        "[toolchain]\nchannel = \"stable\"\n",
    )
    .unwrap();

    repokeeper(dir.path())
        .args(["toolchain", "channel"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to parse"));
}

#[test]
fn missing_toolchain_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    repokeeper(dir.path())
        .args(["toolchain", "channel"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("rust-toolchain.toml"));
}

#[test]
fn release_without_jira_credentials_fails() {
    let dir = tempfile::tempdir().unwrap();
    repokeeper(dir.path())
        .env("JIRA_SERVER", "http://127.0.0.1:9")
        .args(["release", "create", "1.2.0", "--project", "SQLC"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("JIRA_EMAIL"));
}

#[test]
fn release_without_server_fails_before_credentials() {
    let dir = tempfile::tempdir().unwrap();
    repokeeper(dir.path())
        .env("JIRA_EMAIL", "ci@example.com")
        .env("JIRA_TOKEN", "secret")
        .args(["issue", "show", "SQLC-1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("JIRA_SERVER"))
        .stderr(predicate::str::contains("secret").not());
}

#[test]
fn release_from_event_needs_a_payload() {
    let dir = tempfile::tempdir().unwrap();
    repokeeper(dir.path())
        .args(["release", "from-github-event", "--project", "SQLC"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("GITHUB_EVENT_PATH"));
}

#[test]
fn release_from_event_file_creates_jira_release() {
    let dir = tempfile::tempdir().unwrap();
    let event = dir.path().join("event.json");
    std::fs::write(
        &event,
        r#"{"action":"published","release":{"tag_name":"v1.4.0","name":"1.4.0","prerelease":false,"html_url":"https://github.com/octo/widgets/releases/tag/v1.4.0"}}"#,
    )
    .unwrap();
    let server = StubServer::serve(vec![(
        201,
        r#"{"id":"10042","name":"1.4.0","projectId":10200,"released":false,"archived":false}"#,
    )]);

    repokeeper(dir.path())
        .env("JIRA_SERVER", &server.url)
        .env("JIRA_EMAIL", "ci@example.com")
        .env("JIRA_TOKEN", "secret")
        .args(["release", "from-github-event", "--project", "SQLC", "--event-path"])
        .arg(&event)
        .assert()
        .success()
        .stdout(predicate::str::contains("created release 1.4.0 (id 10042) in SQLC"));

    let requests = server.finish();
    assert_eq!(requests[0].path, "/rest/api/2/version");
    let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(body["name"], "1.4.0");
    assert_eq!(body["project"], "SQLC");
}

#[test]
fn bare_repo_name_needs_an_owner() {
    let dir = tempfile::tempdir().unwrap();
    repokeeper(dir.path())
        .args(["labels", "list", "widgets"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("github.owner"));
}

#[test]
fn label_catalog_lists_every_category() {
    let dir = tempfile::tempdir().unwrap();
    repokeeper(dir.path())
        .args(["labels", "catalog"])
        .assert()
        .success()
        .stdout(predicate::str::contains("env: linux"))
        .stdout(predicate::str::contains("type: fix"))
        .stdout(predicate::str::contains("workflow: needs-triage"));
}

#[test]
fn label_catalog_filters_by_category() {
    let dir = tempfile::tempdir().unwrap();
    repokeeper(dir.path())
        .args(["labels", "catalog", "--category", "env"])
        .assert()
        .success()
        .stdout(predicate::str::contains("env: macos"))
        .stdout(predicate::str::contains("type:").not());
}

#[test]
fn explicit_config_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    repokeeper(dir.path())
        .args(["--config", "nope.toml", "schema"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn invalid_project_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".repokeeper.toml"), "[commits\nbase = 1\n").unwrap();
    repokeeper(dir.path())
        .arg("schema")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(".repokeeper.toml"));
}

#[test]
fn log_file_receives_events() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("rust-toolchain.toml"),
        "[toolchain]\nchannel = \"1.75.0\"\n",
    )
    .unwrap();
    let log = dir.path().join("run.log");

    let mut cmd = Command::cargo_bin("repokeeper").unwrap();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path())
        .env_remove("RUST_LOG")
        .env_remove("GITHUB_OUTPUT")
        .arg("--log-file")
        .arg(&log)
        .args(["toolchain", "channel"])
        .assert()
        .success();

    let contents = std::fs::read_to_string(&log).unwrap();
    assert!(contents.contains("Extracting Rust version"));
    assert!(!contents.contains("\u{1b}["));
}
