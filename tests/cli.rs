//! Integration tests for the taskvault CLI

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

use taskvault::audit::{LogRequest, TransactionLogger};
use taskvault::backup::ListOptions;
use taskvault::config::{Settings, VaultPaths};
use taskvault::models::{Row, TrackedTable};
use taskvault::storage::{self, tables, Database};

fn taskvault(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("taskvault").unwrap();
    cmd.env("TASKVAULT_DATA_DIR", dir.path());
    cmd.env_remove("RUST_LOG");
    cmd
}

fn open(dir: &TempDir) -> (VaultPaths, Settings, Database) {
    let paths = VaultPaths::with_base_dir(dir.path().to_path_buf());
    let settings = Settings::load_or_create(&paths).unwrap();
    let db = storage::initialize(&paths).unwrap();
    (paths, settings, db)
}

fn seed_task(db: &Database, id: &str, text: &str) {
    let row = Row::from_json(
        TrackedTable::Tasks,
        &json!({"id": id, "tekst": text, "lijst": "inbox", "user_id": "u1"}),
    )
    .unwrap();
    db.with_connection(|conn| tables::insert(conn, &row)).unwrap();
}

fn task_count(db: &Database) -> u64 {
    db.with_connection(|conn| tables::count(conn, TrackedTable::Tasks))
        .unwrap()
}

fn latest_backup_id(dir: &TempDir) -> String {
    let (paths, settings, db) = open(dir);
    let manager = taskvault::cli::backup_manager(&paths, &settings, &db).unwrap();
    let page = manager.list_backups(&ListOptions::default()).unwrap();
    page.backups[0].backup_id.to_string()
}

#[test]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    taskvault(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("transaction-log replay"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_init_and_config() {
    let dir = TempDir::new().unwrap();
    taskvault(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialization complete!"));

    assert!(dir.path().join("config.json").exists());
    assert!(dir.path().join("taskvault.db").exists());

    taskvault(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized:    true"))
        .stdout(predicate::str::contains("Retention:       24 hours"))
        .stdout(predicate::str::contains("Retention:       72 hours"));
}

#[test]
fn test_backup_list_empty() {
    let dir = TempDir::new().unwrap();
    taskvault(&dir)
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No backups found."));
}

#[test]
fn test_backup_create_and_list() {
    let dir = TempDir::new().unwrap();
    {
        let (_, _, db) = open(&dir);
        seed_task(&db, "t1", "Write report");
    }

    taskvault(&dir)
        .args(["backup", "create"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup created: backup-"))
        .stdout(predicate::str::contains("taken"));

    taskvault(&dir)
        .args(["backup", "list", "--status", "completed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("manual"))
        .stdout(predicate::str::contains("completed"))
        .stdout(predicate::str::contains("Total: 1 backup(s)"));

    let backup_id = latest_backup_id(&dir);
    let output = dir.path().join("download.json.gz");
    taskvault(&dir)
        .args(["backup", "download", &backup_id, "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Downloaded"));
    assert!(output.exists());
}

#[test]
fn test_restore_requires_force() {
    let dir = TempDir::new().unwrap();
    let (_, _, db) = open(&dir);
    seed_task(&db, "t1", "Write report");

    taskvault(&dir).args(["backup", "create"]).assert().success();
    let backup_id = latest_backup_id(&dir);

    seed_task(&db, "t2", "Added after the backup");

    taskvault(&dir)
        .args(["backup", "restore", &backup_id, "--no-replay"])
        .assert()
        .success()
        .stdout(predicate::str::contains("WARNING"))
        .stdout(predicate::str::contains("--force"));
    assert_eq!(task_count(&db), 2);

    taskvault(&dir)
        .args(["backup", "restore", &backup_id, "--no-replay", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored backup"));
    assert_eq!(task_count(&db), 1);
}

#[test]
fn test_unknown_backup_fails() {
    let dir = TempDir::new().unwrap();
    taskvault(&dir)
        .args(["backup", "show", "backup-1999-01-01_00-00-00-000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Backup not found"));
}

#[test]
fn test_log_list_and_undo() {
    let dir = TempDir::new().unwrap();
    let (_, settings, db) = open(&dir);
    seed_task(&db, "t1", "Write report");

    let logger = TransactionLogger::new(db.clone(), settings.transaction_log.clone());
    let entry = logger
        .log(
            LogRequest::insert(
                TrackedTable::Tasks,
                "t1",
                json!({"id": "t1", "tekst": "Write report", "lijst": "inbox"}),
            )
            .by_user("u1"),
        )
        .unwrap();

    taskvault(&dir)
        .args(["log", "list", "--table", "taken", "--since", "1h"])
        .assert()
        .success()
        .stdout(predicate::str::contains("INSERT"))
        .stdout(predicate::str::contains("u1"))
        .stdout(predicate::str::contains("Total: 1 transaction(s)"));

    taskvault(&dir)
        .args(["log", "undo", &entry.id.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Undone"));
    assert_eq!(task_count(&db), 0);
}

#[test]
fn test_log_list_rejects_bad_time() {
    let dir = TempDir::new().unwrap();
    taskvault(&dir)
        .args(["log", "list", "--since", "yesterday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid time"));
}

#[test]
fn test_log_list_rejects_untracked_table() {
    let dir = TempDir::new().unwrap();
    taskvault(&dir)
        .args(["log", "list", "--table", "budgets"])
        .assert()
        .failure();
}
