use glossd_core::db::migrations::latest_version;
use glossd_core::{open_db, open_db_in_memory, DbError, DbSettings};
use rusqlite::Connection;

#[test]
fn fresh_database_reaches_latest_version() {
    let conn = open_db_in_memory().unwrap();
    let version: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, latest_version());
    assert!(latest_version() > 0);
}

#[test]
fn reopening_a_migrated_database_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("glossary.db");

    {
        let conn = open_db(&path, DbSettings::default()).unwrap();
        conn.execute(
            "INSERT INTO terms (term, definition, created_at, updated_at)
             VALUES ('WAL', 'write-ahead log', 1, 1);",
            [],
        )
        .unwrap();
    }

    let conn = open_db(&path, DbSettings::default()).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM terms;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn newer_schema_versions_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("glossary.db");

    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version() + 1))
            .unwrap();
    }

    let result = open_db(&path, DbSettings::default());
    match result {
        Err(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        }) => {
            assert_eq!(db_version, latest_version() + 1);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("expected UnsupportedSchemaVersion, got {other:?}"),
    }
}
