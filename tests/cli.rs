//! End-to-end tests for the kicksync binary.
//!
//! Every test runs with HOME pointed at a temp dir so the session marker,
//! settings file and default database never touch the real home directory.

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

fn kicksync(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("kicksync").unwrap();
    cmd.env("HOME", home.path())
        .env_remove("KICKSYNC_USER")
        .env_remove("KICKSYNC_DB")
        .env_remove("KICKSYNC_REMOTE_URL")
        .env_remove("KICKSYNC_API_KEY")
        .env_remove("KICKSYNC_ACCESS_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_version_reports_schema() {
    let home = TempDir::new().unwrap();
    let output = kicksync(&home).args(["version", "--json"]).output().unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["schema"], 4);
}

#[test]
fn test_migrate_creates_database() {
    let home = TempDir::new().unwrap();
    let db = home.path().join("nested").join("local.db");

    let output = kicksync(&home)
        .args(["migrate", "--json", "--db"])
        .arg(&db)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["schema_version"], 4);
    assert!(db.exists());
}

#[test]
fn test_kicks_add_then_list() {
    let home = TempDir::new().unwrap();
    let db = home.path().join("kicksync.db");

    kicksync(&home)
        .args(["kicks", "add", "7", "--date", "2026-03-01", "-t", "evening", "--user", "u1", "--json", "--db"])
        .arg(&db)
        .assert()
        .success();

    let output = kicksync(&home)
        .args(["kicks", "list", "--user", "u1", "--json", "--db"])
        .arg(&db)
        .output()
        .unwrap();
    assert!(output.status.success());

    let entries = stdout_json(&output);
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["count"], 7);
    assert_eq!(entries[0]["time_of_day"], "evening");
    assert_eq!(entries[0]["sync_status"], "pending");

    // Another user sees nothing.
    let output = kicksync(&home)
        .args(["kicks", "list", "--user", "u2", "--json", "--db"])
        .arg(&db)
        .output()
        .unwrap();
    assert_eq!(stdout_json(&output).as_array().unwrap().len(), 0);
}

#[test]
fn test_session_marker_supplies_user() {
    let home = TempDir::new().unwrap();
    let db = home.path().join("kicksync.db");

    kicksync(&home).args(["session", "set", "u5"]).assert().success();
    kicksync(&home)
        .args(["goals", "add", "Walk daily", "--json", "--db"])
        .arg(&db)
        .assert()
        .success();

    let output = kicksync(&home)
        .args(["goals", "list", "--json", "--db"])
        .arg(&db)
        .output()
        .unwrap();
    let goals = stdout_json(&output);
    assert_eq!(goals[0]["user_id"], "u5");
}

#[test]
fn test_not_signed_in_exits_3() {
    let home = TempDir::new().unwrap();
    let db = home.path().join("kicksync.db");

    let output = kicksync(&home)
        .args(["kicks", "list", "--db"])
        .arg(&db)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));

    let err: Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(err["error"]["code"], "NOT_SIGNED_IN");
}

#[test]
fn test_invalid_date_exits_4() {
    let home = TempDir::new().unwrap();
    let db = home.path().join("kicksync.db");

    kicksync(&home)
        .args(["kicks", "add", "3", "--date", "03/01/2026", "--user", "u1", "--db"])
        .arg(&db)
        .assert()
        .code(4);
}

#[test]
fn test_sync_without_remote_exits_7() {
    let home = TempDir::new().unwrap();
    let db = home.path().join("kicksync.db");

    let output = kicksync(&home)
        .args(["sync", "--user", "u1", "--db"])
        .arg(&db)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));

    let err: Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(err["error"]["code"], "CONFIG_ERROR");
    assert!(err["error"]["hint"].as_str().is_some());
}

#[test]
fn test_unknown_sync_domain_exits_4() {
    let home = TempDir::new().unwrap();
    let db = home.path().join("kicksync.db");

    kicksync(&home)
        .args(["sync", "--domain", "weather", "--user", "u1", "--db"])
        .arg(&db)
        .assert()
        .code(4);
}

#[test]
fn test_content_list_empty_cache() {
    let home = TempDir::new().unwrap();
    let db = home.path().join("kicksync.db");

    let output = kicksync(&home)
        .args(["content", "list", "--kind", "tips", "--json", "--db"])
        .arg(&db)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output), Value::Array(vec![]));
}

#[test]
fn test_status_lists_every_domain() {
    let home = TempDir::new().unwrap();
    let db = home.path().join("kicksync.db");

    let output = kicksync(&home)
        .args(["status", "--json", "--db"])
        .arg(&db)
        .output()
        .unwrap();
    assert!(output.status.success());

    let status = stdout_json(&output);
    assert!(status["user"].is_null());
    assert_eq!(status["domains"].as_array().unwrap().len(), 5);
}
