//! Core domain logic for the glossd term store.
//! This crate is the single source of truth for business invariants; both
//! protocol front-ends consume it through one shared service instance.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod retry;
pub mod service;

pub use db::{
    open_db, open_db_in_memory, ConnectionPool, DbError, DbResult, DbSettings, PoolConfig,
    PoolError, PoolStats, PooledConnection,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::term::{
    validate_definition, validate_term, SortField, SortOrder, Term, TermValidationError,
    TERM_MAX_CHARS,
};
pub use repo::term_repo::{RepoError, RepoResult, SqliteTermRepository, TermRepository};
pub use retry::{RetryPolicy, Transient};
pub use service::glossary_service::{GlossaryError, GlossaryResult, GlossaryService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
