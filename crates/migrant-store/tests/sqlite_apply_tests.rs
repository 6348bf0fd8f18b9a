//! End-to-end applier runs against real SQLite files

#![allow(clippy::unwrap_used, clippy::expect_used)]

use migrant_core::errors::ExErrorKind;
use migrant_core::{
    Applier, ApplyOptions, ConnectionDescriptor, Environment, MigrationPlan, Mode, Selection,
};
use migrant_store::{load_plan, DriverConnector};
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_migrations(dir: &Path, files: &[(&str, &str)]) {
    for (name, body) in files {
        fs::write(dir.join(name), body).unwrap();
    }
}

fn sqlite_env(name: &str, path: &Path) -> Environment {
    Environment::new(
        name,
        ConnectionDescriptor::sqlite(path.to_str().unwrap().to_string()),
    )
}

fn seeded_db(dir: &Path, name: &str, seed: &str) -> PathBuf {
    let path = dir.join(format!("{name}.db"));
    Connection::open(&path).unwrap().execute_batch(seed).unwrap();
    path
}

fn column_names(path: &Path, table: &str) -> Vec<String> {
    let conn = Connection::open(path).unwrap();
    let mut stmt = conn
        .prepare(&format!("SELECT name FROM pragma_table_info('{table}') ORDER BY cid"))
        .unwrap();
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    names
}

fn index_exists(path: &Path, index: &str) -> bool {
    let conn = Connection::open(path).unwrap();
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?1",
            [index],
            |row| row.get(0),
        )
        .unwrap();
    count == 1
}

fn crm_plan(dir: &Path) -> MigrationPlan {
    write_migrations(
        dir,
        &[
            (
                "010-leads-created-date.sql",
                "CREATE TABLE IF NOT EXISTS leads (id INTEGER PRIMARY KEY);\n\
                 ALTER TABLE leads ADD COLUMN created_date TEXT;\n",
            ),
            (
                "011-employees-updated-at.sql",
                "CREATE TABLE IF NOT EXISTS employees (id INTEGER PRIMARY KEY, updated_at TEXT);\n",
            ),
        ],
    );
    load_plan(dir).unwrap()
}

#[tokio::test]
async fn test_dev_applies_migrations_from_directory() {
    let temp = TempDir::new().unwrap();
    let migrations = temp.path().join("migrations");
    fs::create_dir(&migrations).unwrap();
    let plan = crm_plan(&migrations);
    let dev = temp.path().join("dev.db");

    let applier = Applier::new(DriverConnector::default(), ApplyOptions::default());
    let report = applier.apply(&plan, &[sqlite_env("dev", &dev)]).await.unwrap();

    assert!(report.is_success());
    let keys: Vec<_> = report
        .get("dev")
        .unwrap()
        .results
        .iter()
        .map(|r| r.migration_id.to_string())
        .collect();
    assert_eq!(keys, vec!["010", "011"]);
    assert_eq!(column_names(&dev, "leads"), vec!["id", "created_date"]);
    assert_eq!(column_names(&dev, "employees"), vec!["id", "updated_at"]);
}

#[tokio::test]
async fn test_unique_index_over_duplicates_halts_environment() {
    let temp = TempDir::new().unwrap();
    let migrations = temp.path().join("migrations");
    fs::create_dir(&migrations).unwrap();
    write_migrations(
        &migrations,
        &[
            (
                "076-archive-unique.sql",
                "CREATE UNIQUE INDEX IF NOT EXISTS accounts_archive_uniq ON accounts_archive (account_id);",
            ),
            (
                "091-ai-suggestions-unique.sql",
                "CREATE UNIQUE INDEX IF NOT EXISTS ai_suggestions_uniq ON ai_suggestions (lead_id);",
            ),
        ],
    );
    let plan = load_plan(&migrations).unwrap();
    let main = seeded_db(
        temp.path(),
        "main",
        "CREATE TABLE accounts_archive (account_id INTEGER);
         INSERT INTO accounts_archive VALUES (7), (7);
         CREATE TABLE ai_suggestions (lead_id INTEGER);",
    );

    let applier = Applier::new(DriverConnector::default(), ApplyOptions::default());
    let report = applier.apply(&plan, &[sqlite_env("main", &main)]).await.unwrap();

    let main_report = report.get("main").unwrap();
    assert_eq!(main_report.results.len(), 1);
    let error = main_report.results[0].error().unwrap();
    assert_eq!(error.kind(), ExErrorKind::Execution);
    assert_eq!(error.migration_id(), Some("076"));
    assert!(error.message().contains("UNIQUE constraint failed"), "{}", error);

    assert!(!index_exists(&main, "accounts_archive_uniq"));
    assert!(!index_exists(&main, "ai_suggestions_uniq"));
    assert!(!report.is_success());
}

#[tokio::test]
async fn test_failing_environment_does_not_affect_other() {
    let temp = TempDir::new().unwrap();
    let migrations = temp.path().join("migrations");
    fs::create_dir(&migrations).unwrap();
    write_migrations(
        &migrations,
        &[
            ("001-workers.sql", "CREATE TABLE IF NOT EXISTS workers (id INTEGER PRIMARY KEY);"),
            ("002-workers-tenant.sql", "ALTER TABLE workers ADD COLUMN tenant_id INTEGER;"),
        ],
    );
    let plan = load_plan(&migrations).unwrap();
    // main already has the column, so a non-idempotent ALTER fails there
    let main = seeded_db(
        temp.path(),
        "main",
        "CREATE TABLE workers (id INTEGER PRIMARY KEY, tenant_id INTEGER);",
    );
    let dev = temp.path().join("dev.db");

    for mode in [Mode::Parallel, Mode::Sequential] {
        let _ = fs::remove_file(&dev);
        let applier = Applier::new(
            DriverConnector::default(),
            ApplyOptions { mode, ledger: false },
        );
        let report = applier
            .apply(&plan, &[sqlite_env("main", &main), sqlite_env("dev", &dev)])
            .await
            .unwrap();

        let main_report = report.get("main").unwrap();
        assert_eq!(main_report.results.len(), 2);
        assert!(main_report.results[0].is_success());
        let error = main_report.results[1].error().unwrap();
        assert!(error.message().contains("duplicate column name"), "{}", error);

        assert!(report.get("dev").unwrap().is_success(), "mode {:?}", mode);
        assert_eq!(column_names(&dev, "workers"), vec!["id", "tenant_id"]);
    }
}

#[tokio::test]
async fn test_unopenable_database_is_connectivity_failure() {
    let temp = TempDir::new().unwrap();
    let migrations = temp.path().join("migrations");
    fs::create_dir(&migrations).unwrap();
    let plan = crm_plan(&migrations);
    let missing = temp.path().join("no-such-dir").join("main.db");
    let dev = temp.path().join("dev.db");

    let applier = Applier::new(DriverConnector::default(), ApplyOptions::default());
    let report = applier
        .apply(&plan, &[sqlite_env("main", &missing), sqlite_env("dev", &dev)])
        .await
        .unwrap();

    let main_report = report.get("main").unwrap();
    assert_eq!(main_report.results.len(), 1);
    assert_eq!(main_report.results[0].migration_id.as_str(), "010");
    assert_eq!(
        main_report.results[0].error().unwrap().kind(),
        ExErrorKind::Connectivity
    );
    assert!(report.get("dev").unwrap().is_success());
}

#[tokio::test]
async fn test_idempotent_bodies_rerun_cleanly() {
    let temp = TempDir::new().unwrap();
    let migrations = temp.path().join("migrations");
    fs::create_dir(&migrations).unwrap();
    write_migrations(
        &migrations,
        &[
            ("010-leads.sql", "CREATE TABLE IF NOT EXISTS leads (id INTEGER PRIMARY KEY);"),
            (
                "011-leads-index.sql",
                "CREATE INDEX IF NOT EXISTS leads_id_idx ON leads (id);",
            ),
        ],
    );
    let plan = load_plan(&migrations).unwrap();
    let dev = temp.path().join("dev.db");
    let applier = Applier::new(DriverConnector::default(), ApplyOptions::default());

    for _ in 0..2 {
        let report = applier.apply(&plan, &[sqlite_env("dev", &dev)]).await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.get("dev").unwrap().applied_count(), 2);
    }
}

#[tokio::test]
async fn test_ledger_skips_recorded_and_detects_drift() {
    let temp = TempDir::new().unwrap();
    let migrations = temp.path().join("migrations");
    fs::create_dir(&migrations).unwrap();
    let plan = crm_plan(&migrations);
    let dev = temp.path().join("dev.db");
    let applier = Applier::new(
        DriverConnector::default(),
        ApplyOptions {
            mode: Mode::Parallel,
            ledger: true,
        },
    );

    let first = applier.apply(&plan, &[sqlite_env("dev", &dev)]).await.unwrap();
    assert_eq!(first.get("dev").unwrap().applied_count(), 2);

    // The ALTER in 010 is not idempotent; only the ledger makes this rerun pass
    let second = applier.apply(&plan, &[sqlite_env("dev", &dev)]).await.unwrap();
    let dev_report = second.get("dev").unwrap();
    assert!(dev_report.is_success());
    assert!(dev_report.results.iter().all(|r| r.already_applied));

    let status = applier.status(&plan, &[sqlite_env("dev", &dev)]).await.unwrap();
    assert!(status.is_healthy());
    assert_eq!(status.get("dev").unwrap().pending_count(), 0);

    fs::write(
        migrations.join("011-employees-updated-at.sql"),
        "CREATE TABLE IF NOT EXISTS employees (id INTEGER PRIMARY KEY, updated_at TIMESTAMP);\n",
    )
    .unwrap();
    let edited = load_plan(&migrations).unwrap();

    let drifted = applier.apply(&edited, &[sqlite_env("dev", &dev)]).await.unwrap();
    let dev_report = drifted.get("dev").unwrap();
    assert_eq!(dev_report.results.len(), 2);
    assert!(dev_report.results[0].already_applied);
    assert_eq!(
        dev_report.results[1].error().unwrap().kind(),
        ExErrorKind::ChecksumMismatch
    );

    let status = applier.status(&edited, &[sqlite_env("dev", &dev)]).await.unwrap();
    assert!(status.get("dev").unwrap().has_drift());
}

#[tokio::test]
async fn test_selection_through_key_applies_prefix() {
    let temp = TempDir::new().unwrap();
    let migrations = temp.path().join("migrations");
    fs::create_dir(&migrations).unwrap();
    let plan = crm_plan(&migrations);
    let dev = temp.path().join("dev.db");

    let selected = plan.select(&"..010".parse::<Selection>().unwrap()).unwrap();
    let applier = Applier::new(DriverConnector::default(), ApplyOptions::default());
    let report = applier.apply(&selected, &[sqlite_env("dev", &dev)]).await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.get("dev").unwrap().results.len(), 1);
    assert!(column_names(&dev, "employees").is_empty());
}
