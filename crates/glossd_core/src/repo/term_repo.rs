//! Term repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over the `terms` table.
//! - Keep SQL details inside the core persistence boundary.
//! - Classify low-level SQLite failures into semantic outcomes.
//!
//! # Invariants
//! - The `UNIQUE` constraint on `term` is the authority for key
//!   uniqueness; duplicate inserts surface as `Duplicate`, never as a
//!   generic storage error.
//! - `SQLITE_BUSY`/`SQLITE_LOCKED` surface as `Contention` and nothing
//!   else does; callers rely on this for retry eligibility.
//! - `updated_at` strictly advances on every successful definition change.

use crate::db::{ConnectionPool, DbError, PoolError};
use crate::model::term::{now_ms, SortField, SortOrder, Term};
use crate::retry::Transient;
use log::error;
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

const TERM_SELECT_SQL: &str = "SELECT
    id,
    term,
    definition,
    created_at,
    updated_at
FROM terms";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for term persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// A live record with this term key already exists.
    Duplicate(String),
    /// No live record exists for this term key.
    NotFound(String),
    /// The busy timeout elapsed while waiting for the write lock.
    Contention,
    /// Pool checkout failed.
    Pool(PoolError),
    /// Unexpected storage failure; not retryable.
    Db(DbError),
    /// Persisted state violates the record invariants.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Duplicate(term) => write!(f, "term `{term}` already exists"),
            Self::NotFound(term) => write!(f, "term `{term}` not found"),
            Self::Contention => write!(f, "write lock contention exceeded the busy timeout"),
            Self::Pool(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted term data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Pool(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PoolError> for RepoError {
    fn from(value: PoolError) -> Self {
        Self::Pool(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if is_contention(&value) {
            Self::Contention
        } else {
            Self::Db(DbError::Sqlite(value))
        }
    }
}

impl Transient for RepoError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Contention)
    }
}

/// Repository interface for term CRUD operations.
pub trait TermRepository {
    /// Inserts one record; both timestamps are set to the same instant.
    fn insert(&self, term: &str, definition: &str) -> RepoResult<Term>;
    /// Looks one record up by its key. Absence is not an error.
    fn get_by_term(&self, term: &str) -> RepoResult<Option<Term>>;
    /// Lists all records in a deterministic order (ties broken by id).
    fn list(&self, sort: SortField, order: SortOrder) -> RepoResult<Vec<Term>>;
    /// Replaces the definition and advances `updated_at`.
    fn update_definition(&self, term: &str, new_definition: &str) -> RepoResult<Term>;
    /// Deletes one record. Returns whether a record existed.
    fn delete_by_term(&self, term: &str) -> RepoResult<bool>;
}

/// SQLite-backed term repository over a bounded connection pool.
///
/// Every call checks one connection out of the pool; pool checkout is the
/// sole synchronization point of the storage layer.
pub struct SqliteTermRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteTermRepository {
    /// Constructs a repository over an opened pool.
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }
}

impl TermRepository for SqliteTermRepository {
    fn insert(&self, term: &str, definition: &str) -> RepoResult<Term> {
        let conn = self.pool.checkout()?;
        let now = now_ms();

        conn.execute(
            "INSERT INTO terms (term, definition, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3);",
            params![term, definition, now],
        )
        .map_err(|err| {
            if is_unique_violation(&err) {
                RepoError::Duplicate(term.to_string())
            } else {
                RepoError::from(err)
            }
        })?;

        let id = conn.last_insert_rowid();
        read_term_by_id(&conn, id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("inserted term `{term}` missing on read-back"))
        })
    }

    fn get_by_term(&self, term: &str) -> RepoResult<Option<Term>> {
        let conn = self.pool.checkout()?;
        read_term_by_key(&conn, term)
    }

    fn list(&self, sort: SortField, order: SortOrder) -> RepoResult<Vec<Term>> {
        let conn = self.pool.checkout()?;

        // Sort column and direction come from closed enums; the id
        // tie-break keeps repeated listings byte-identical.
        let sql = format!(
            "{TERM_SELECT_SQL} ORDER BY {} {}, id ASC;",
            sort.as_column(),
            order.as_sql()
        );

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut terms = Vec::new();
        while let Some(row) = rows.next()? {
            terms.push(parse_term_row(row)?);
        }

        Ok(terms)
    }

    fn update_definition(&self, term: &str, new_definition: &str) -> RepoResult<Term> {
        let conn = self.pool.checkout()?;
        let now = now_ms();

        // The MAX clamp keeps updated_at strictly increasing even when two
        // updates land inside the same millisecond.
        let changed = conn.execute(
            "UPDATE terms
             SET
                definition = ?1,
                updated_at = MAX(?2, updated_at + 1)
             WHERE term = ?3;",
            params![new_definition, now, term],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(term.to_string()));
        }

        read_term_by_key(&conn, term)?.ok_or_else(|| {
            RepoError::InvalidData(format!("updated term `{term}` missing on read-back"))
        })
    }

    fn delete_by_term(&self, term: &str) -> RepoResult<bool> {
        let conn = self.pool.checkout()?;
        let changed = conn.execute("DELETE FROM terms WHERE term = ?1;", [term])?;
        Ok(changed > 0)
    }
}

fn read_term_by_key(conn: &Connection, term: &str) -> RepoResult<Option<Term>> {
    let mut stmt = conn.prepare(&format!("{TERM_SELECT_SQL} WHERE term = ?1;"))?;
    let mut rows = stmt.query([term])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_term_row(row)?));
    }
    Ok(None)
}

fn read_term_by_id(conn: &Connection, id: i64) -> RepoResult<Option<Term>> {
    let mut stmt = conn.prepare(&format!("{TERM_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_term_row(row)?));
    }
    Ok(None)
}

fn parse_term_row(row: &Row<'_>) -> RepoResult<Term> {
    let record = Term {
        id: row.get("id")?,
        term: row.get("term")?,
        definition: row.get("definition")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };

    if record.updated_at < record.created_at {
        error!(
            "event=term_read module=repo status=error error_code=invalid_timestamps id={}",
            record.id
        );
        return Err(RepoError::InvalidData(format!(
            "term `{}` has updated_at earlier than created_at",
            record.term
        )));
    }

    Ok(record)
}

fn is_contention(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == rusqlite::ErrorCode::DatabaseBusy
                || inner.code == rusqlite::ErrorCode::DatabaseLocked
    )
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}
