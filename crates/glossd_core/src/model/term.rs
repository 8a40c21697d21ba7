//! Term domain model.
//!
//! # Responsibility
//! - Define the canonical glossary record and its wire shape.
//! - Validate caller-supplied term/definition input.
//! - Parse listing parameters with their documented fallbacks.
//!
//! # Invariants
//! - `id` is assigned by storage, monotonic, never reused.
//! - `term` is case-sensitive and immutable after creation.
//! - `updated_at >= created_at` for every persisted record.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Maximum accepted length of a term key, in characters.
pub const TERM_MAX_CHARS: usize = 256;

/// Canonical glossary record.
///
/// Both protocol adapters serialize this shape verbatim; timestamps are
/// Unix epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    /// Surrogate key assigned by storage. Never reused.
    pub id: i64,
    /// Unique, case-sensitive key. Immutable after creation.
    pub term: String,
    /// Definition body. The only mutable field.
    pub definition: String,
    /// Insertion timestamp in epoch milliseconds.
    pub created_at: i64,
    /// Last-change timestamp in epoch milliseconds.
    pub updated_at: i64,
}

/// Validation failure for caller-supplied input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermValidationError {
    /// The term key is empty or whitespace-only.
    EmptyTerm,
    /// The term key exceeds [`TERM_MAX_CHARS`].
    TermTooLong { chars: usize },
    /// The definition is empty or whitespace-only.
    EmptyDefinition,
}

impl Display for TermValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTerm => write!(f, "term must not be empty"),
            Self::TermTooLong { chars } => write!(
                f,
                "term is {chars} characters long; at most {TERM_MAX_CHARS} are allowed"
            ),
            Self::EmptyDefinition => write!(f, "definition must not be empty"),
        }
    }
}

impl Error for TermValidationError {}

/// Validates a term key for create/lookup operations.
pub fn validate_term(term: &str) -> Result<(), TermValidationError> {
    if term.trim().is_empty() {
        return Err(TermValidationError::EmptyTerm);
    }
    let chars = term.chars().count();
    if chars > TERM_MAX_CHARS {
        return Err(TermValidationError::TermTooLong { chars });
    }
    Ok(())
}

/// Validates a definition body for create/update operations.
pub fn validate_definition(definition: &str) -> Result<(), TermValidationError> {
    if definition.trim().is_empty() {
        return Err(TermValidationError::EmptyDefinition);
    }
    Ok(())
}

/// Columns a listing may be sorted by.
///
/// Anything outside this allow-list silently falls back to `created_at`;
/// listing order must never be able to inject arbitrary SQL or expose the
/// surrogate id ordering as a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Sort by the term key (case-sensitive).
    Term,
    /// Sort by insertion time. The default.
    CreatedAt,
    /// Sort by last-change time.
    UpdatedAt,
}

impl SortField {
    /// Parses a request parameter, falling back to `created_at` for any
    /// unknown value.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("term") => Self::Term,
            Some("updated_at") => Self::UpdatedAt,
            Some("created_at") | None => Self::CreatedAt,
            Some(_) => Self::CreatedAt,
        }
    }

    /// Column name used in ORDER BY clauses.
    pub fn as_column(self) -> &'static str {
        match self {
            Self::Term => "term",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

/// Direction of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    /// Parses a request parameter. Absent and `"desc"` mean descending;
    /// every other value sorts ascending.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            None | Some("desc") => Self::Descending,
            Some(_) => Self::Ascending,
        }
    }

    /// SQL keyword for ORDER BY clauses.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}
