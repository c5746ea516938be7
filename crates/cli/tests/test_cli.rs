use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Binary with an isolated working directory and no credentials
fn nautilex(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("nautilex").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("GITHUB_TOKEN")
        .env_remove("GITHUB_ACCESS_TOKEN")
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("NAUTILEX_LOG_JSON")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_every_command() {
    let dir = TempDir::new().unwrap();
    nautilex(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("handle"))
        .stdout(predicate::str::contains("explore"))
        .stdout(predicate::str::contains("solve"))
        .stdout(predicate::str::contains("query"));
}

#[test]
fn test_migrate_list_shows_bundled_callbacks() {
    let dir = TempDir::new().unwrap();
    nautilex(&dir)
        .args(["migrate", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fix_modality_type"))
        .stdout(predicate::str::contains("fix_experimenter_full_name"))
        .stdout(predicate::str::contains("repair_processing"));
}

#[test]
fn test_migrate_unknown_callback_fails() {
    let dir = TempDir::new().unwrap();
    nautilex(&dir)
        .args(["migrate", "drop_everything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown migration callback: drop_everything"));
}

#[test]
fn test_migrate_id_callback_requires_a_selection() {
    let dir = TempDir::new().unwrap();
    nautilex(&dir)
        .args(["migrate", "fix_channel_names"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--ids or --query"));
}

#[test]
fn test_skip_dry_run_needs_full_run() {
    let dir = TempDir::new().unwrap();
    nautilex(&dir)
        .args(["migrate", "update_channel_name", "--skip-dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--full-run"));
}

#[test]
fn test_migrate_rejects_empty_id_list() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("ids.csv"), "record_id\n").unwrap();
    nautilex(&dir)
        .args(["migrate", "fix_channel_names", "--ids", "ids.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is empty"));
}

#[test]
fn test_handle_docdb_unknown_action_is_400() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("event.json"), r#"{"action": "drop"}"#).unwrap();
    nautilex(&dir)
        .args(["handle", "docdb", "event.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""statusCode":400"#))
        .stdout(predicate::str::contains("Unknown action: drop"));
}

#[test]
fn test_handle_docdb_aggregation_is_501() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("event.json"), r#"{"action": "aggregation"}"#).unwrap();
    nautilex(&dir)
        .args(["handle", "docdb", "event.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""statusCode":501"#));
}

#[test]
fn test_handle_agent_unsupported_method_is_400() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("event.json"),
        r#"{"actionGroup": "github", "apiPath": "/issues", "httpMethod": "DELETE"}"#,
    )
    .unwrap();
    nautilex(&dir)
        .args(["handle", "github-agent", "event.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""statusCode":400"#))
        .stdout(predicate::str::contains("Unsupported HTTP method"));
}

#[test]
fn test_handle_reads_event_from_stdin() {
    let dir = TempDir::new().unwrap();
    nautilex(&dir)
        .args(["handle", "github-action", "-"])
        .write_stdin(r#"{"action": "close_everything"}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""statusCode":400"#));
}

#[test]
fn test_handle_missing_event_file_fails() {
    let dir = TempDir::new().unwrap();
    nautilex(&dir)
        .args(["handle", "docdb", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read event file"));
}

#[test]
fn test_query_rejects_invalid_json() {
    let dir = TempDir::new().unwrap();
    nautilex(&dir)
        .args(["query", "{not json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("filter is not valid JSON"));
}

#[test]
fn test_explore_without_api_key_fails_before_any_request() {
    let dir = TempDir::new().unwrap();
    nautilex(&dir)
        .args(["explore", "--issue", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ANTHROPIC_API_KEY"));
}
