use glossd_core::{
    ConnectionPool, DbSettings, PoolConfig, RepoError, SortField, SortOrder, SqliteTermRepository,
    TermRepository,
};
use std::sync::Arc;
use std::time::Duration;

fn test_pool(dir: &tempfile::TempDir) -> Arc<ConnectionPool> {
    let config = PoolConfig::default()
        .with_max_size(4)
        .with_max_overflow(2)
        .with_acquire_timeout(Duration::from_secs(1))
        .with_settings(DbSettings {
            busy_timeout: Duration::from_secs(1),
        });
    ConnectionPool::open(dir.path().join("glossary.db"), config).unwrap()
}

#[test]
fn insert_and_get_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let repo = SqliteTermRepository::new(test_pool(&dir));

    let created = repo.insert("WAL", "write-ahead log").unwrap();
    assert!(created.id > 0);
    assert_eq!(created.term, "WAL");
    assert_eq!(created.definition, "write-ahead log");
    assert_eq!(created.created_at, created.updated_at);

    let loaded = repo.get_by_term("WAL").unwrap().unwrap();
    assert_eq!(loaded, created);
}

#[test]
fn insert_duplicate_key_is_a_duplicate_not_a_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let repo = SqliteTermRepository::new(test_pool(&dir));

    repo.insert("API", "first").unwrap();
    let err = repo.insert("API", "second").unwrap_err();
    assert!(matches!(err, RepoError::Duplicate(term) if term == "API"));

    // The losing write must not have replaced the stored definition.
    let stored = repo.get_by_term("API").unwrap().unwrap();
    assert_eq!(stored.definition, "first");
}

#[test]
fn term_keys_are_case_sensitive() {
    let dir = tempfile::tempdir().unwrap();
    let repo = SqliteTermRepository::new(test_pool(&dir));

    repo.insert("Index", "ordered lookup structure").unwrap();
    repo.insert("index", "lowercase variant").unwrap();

    assert_eq!(
        repo.get_by_term("Index").unwrap().unwrap().definition,
        "ordered lookup structure"
    );
    assert_eq!(
        repo.get_by_term("index").unwrap().unwrap().definition,
        "lowercase variant"
    );
}

#[test]
fn get_missing_returns_none() {
    let dir = tempfile::tempdir().unwrap();
    let repo = SqliteTermRepository::new(test_pool(&dir));

    assert!(repo.get_by_term("ghost").unwrap().is_none());
}

#[test]
fn update_advances_updated_at_strictly() {
    let dir = tempfile::tempdir().unwrap();
    let repo = SqliteTermRepository::new(test_pool(&dir));

    let created = repo.insert("B-tree", "balanced tree").unwrap();

    let first = repo.update_definition("B-tree", "balanced search tree").unwrap();
    assert_eq!(first.definition, "balanced search tree");
    assert!(first.updated_at > created.updated_at);
    assert!(first.updated_at >= first.created_at);
    assert_eq!(first.created_at, created.created_at);

    // Two updates inside the same millisecond must still move the stamp.
    let second = repo.update_definition("B-tree", "self-balancing search tree").unwrap();
    assert!(second.updated_at > first.updated_at);
}

#[test]
fn update_missing_returns_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let repo = SqliteTermRepository::new(test_pool(&dir));

    let err = repo.update_definition("ghost", "boo").unwrap_err();
    assert!(matches!(err, RepoError::NotFound(term) if term == "ghost"));
}

#[test]
fn delete_reports_whether_a_record_existed() {
    let dir = tempfile::tempdir().unwrap();
    let repo = SqliteTermRepository::new(test_pool(&dir));

    repo.insert("tmp", "temporary").unwrap();
    assert!(repo.delete_by_term("tmp").unwrap());
    assert!(!repo.delete_by_term("tmp").unwrap());
    assert!(repo.get_by_term("tmp").unwrap().is_none());
}

#[test]
fn list_breaks_timestamp_ties_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let pool = test_pool(&dir);
    let repo = SqliteTermRepository::new(Arc::clone(&pool));

    repo.insert("gamma", "third letter").unwrap();
    repo.insert("alpha", "first letter").unwrap();
    repo.insert("beta", "second letter").unwrap();

    // Force identical timestamps so only the id tie-break orders rows.
    {
        let conn = pool.checkout().unwrap();
        conn.execute("UPDATE terms SET created_at = 1700000000000, updated_at = 1700000000000;", [])
            .unwrap();
    }

    let listed = repo.list(SortField::CreatedAt, SortOrder::Descending).unwrap();
    let ids: Vec<i64> = listed.iter().map(|t| t.id).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted, "ties must be broken by ascending id");

    let again = repo.list(SortField::CreatedAt, SortOrder::Descending).unwrap();
    assert_eq!(listed, again, "repeated listings must be identical");
}

#[test]
fn term_serializes_with_wire_field_names() {
    let dir = tempfile::tempdir().unwrap();
    let repo = SqliteTermRepository::new(test_pool(&dir));

    let created = repo.insert("WAL", "write-ahead log").unwrap();
    let value = serde_json::to_value(&created).unwrap();

    assert_eq!(value["id"], created.id);
    assert_eq!(value["term"], "WAL");
    assert_eq!(value["definition"], "write-ahead log");
    assert_eq!(value["created_at"], created.created_at);
    assert_eq!(value["updated_at"], created.updated_at);
}

#[test]
fn list_sorts_by_term_in_both_directions() {
    let dir = tempfile::tempdir().unwrap();
    let repo = SqliteTermRepository::new(test_pool(&dir));

    repo.insert("beta", "b").unwrap();
    repo.insert("alpha", "a").unwrap();
    repo.insert("gamma", "c").unwrap();

    let ascending = repo.list(SortField::Term, SortOrder::Ascending).unwrap();
    let keys: Vec<&str> = ascending.iter().map(|t| t.term.as_str()).collect();
    assert_eq!(keys, ["alpha", "beta", "gamma"]);

    let descending = repo.list(SortField::Term, SortOrder::Descending).unwrap();
    let keys: Vec<&str> = descending.iter().map(|t| t.term.as_str()).collect();
    assert_eq!(keys, ["gamma", "beta", "alpha"]);
}
