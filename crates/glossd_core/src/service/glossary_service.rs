//! Glossary use-case service.
//!
//! # Responsibility
//! - Enforce input validation and the term-uniqueness business rule.
//! - Wrap mutating repository calls in the retry policy.
//! - Map repository outcomes onto the protocol-facing error taxonomy.
//!
//! # Invariants
//! - A term is either absent or present; update/delete of an absent term
//!   is rejected, never silently ignored.
//! - The storage uniqueness constraint is the authority for conflicts;
//!   the existence pre-check is only a fast path for a friendlier answer.
//! - The service holds no mutable state of its own; it is safe to share
//!   behind `Arc` across request workers.

use crate::model::term::{
    validate_definition, validate_term, SortField, SortOrder, Term, TermValidationError,
};
use crate::repo::term_repo::{RepoError, TermRepository};
use crate::retry::RetryPolicy;
use log::{error, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Protocol-facing error taxonomy.
///
/// Adapters translate these kinds one-to-one into wire status signals;
/// nothing here ever aborts the process.
#[derive(Debug)]
pub enum GlossaryError {
    /// Malformed or empty input. Always a client mistake, never retried.
    Validation(TermValidationError),
    /// No record for the key. Normal control flow, not logged as an error.
    NotFound(String),
    /// Uniqueness violation; the client must choose a different key.
    Conflict(String),
    /// Transient storage contention survived the retry bound.
    Contention,
    /// Unexpected storage failure. Logged for operator attention.
    Storage(RepoError),
}

impl GlossaryError {
    /// Stable machine-readable kind, used in structured error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Contention => "contention",
            Self::Storage(_) => "storage",
        }
    }
}

impl Display for GlossaryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(term) => write!(f, "Term '{term}' not found"),
            Self::Conflict(term) => write!(f, "Term '{term}' already exists"),
            Self::Contention => write!(f, "storage is busy, retry later"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GlossaryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for GlossaryError {
    fn from(value: RepoError) -> Self {
        use crate::db::PoolError;
        match value {
            RepoError::Duplicate(term) => Self::Conflict(term),
            RepoError::NotFound(term) => Self::NotFound(term),
            RepoError::Contention => Self::Contention,
            // A timed-out pool checkout is overload, not breakage; clients
            // should back off and retry exactly as for lock contention.
            RepoError::Pool(PoolError::Exhausted { .. }) => Self::Contention,
            other => Self::Storage(other),
        }
    }
}

pub type GlossaryResult<T> = Result<T, GlossaryError>;

/// Glossary service facade over a term repository.
pub struct GlossaryService<R: TermRepository> {
    repo: R,
    retry: RetryPolicy,
}

impl<R: TermRepository> GlossaryService<R> {
    /// Creates a service with the default retry policy.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the retry policy for mutating operations.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Creates one term.
    ///
    /// Rejects empty input; answers a conflict when the key is taken.
    /// The returned record has `created_at == updated_at`.
    pub fn create(&self, term: &str, definition: &str) -> GlossaryResult<Term> {
        validate_term(term).map_err(GlossaryError::Validation)?;
        validate_definition(definition).map_err(GlossaryError::Validation)?;

        if self
            .repo
            .get_by_term(term)
            .map_err(|err| fail("create", err.into()))?
            .is_some()
        {
            return Err(GlossaryError::Conflict(term.to_string()));
        }

        // A creator racing past the pre-check loses at the constraint and
        // still gets a conflict, not a storage error.
        self.retry
            .run(|| self.repo.insert(term, definition))
            .map_err(|err| fail("create", err.into()))
    }

    /// Gets one term by key.
    pub fn get(&self, term: &str) -> GlossaryResult<Term> {
        self.repo
            .get_by_term(term)
            .map_err(|err| fail("get", err.into()))?
            .ok_or_else(|| GlossaryError::NotFound(term.to_string()))
    }

    /// Lists all terms.
    ///
    /// Unknown sort fields fall back to `created_at`; order defaults to
    /// descending. Ties are broken by id so repeated listings are
    /// identical.
    pub fn list(&self, sort_by: Option<&str>, order: Option<&str>) -> GlossaryResult<Vec<Term>> {
        let sort = SortField::from_param(sort_by);
        let order = SortOrder::from_param(order);
        self.repo
            .list(sort, order)
            .map_err(|err| fail("list", err.into()))
    }

    /// Replaces a term's definition and advances `updated_at`.
    pub fn update(&self, term: &str, new_definition: &str) -> GlossaryResult<Term> {
        validate_definition(new_definition).map_err(GlossaryError::Validation)?;

        self.retry
            .run(|| self.repo.update_definition(term, new_definition))
            .map_err(|err| fail("update", err.into()))
    }

    /// Deletes one term. Deletion is unconditional and permanent.
    pub fn delete(&self, term: &str) -> GlossaryResult<()> {
        let deleted = self
            .retry
            .run(|| self.repo.delete_by_term(term))
            .map_err(|err| fail("delete", err.into()))?;

        if !deleted {
            return Err(GlossaryError::NotFound(term.to_string()));
        }
        Ok(())
    }
}

/// Logs operator-relevant failures on their way out of the core.
fn fail(op: &'static str, err: GlossaryError) -> GlossaryError {
    match &err {
        GlossaryError::Storage(inner) => {
            error!("event=glossary_op module=service status=error op={op} error_code=storage error={inner}");
        }
        GlossaryError::Contention => {
            warn!("event=glossary_op module=service status=error op={op} error_code=contention");
        }
        _ => {}
    }
    err
}
