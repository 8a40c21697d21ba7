//! Domain model for glossary records.
//!
//! # Responsibility
//! - Define the canonical record shared by both protocol front-ends.
//! - Keep input validation and listing parameters in one place.
//!
//! # Invariants
//! - Every record is identified by a stable surrogate `id` and a unique
//!   `term` key.
//! - Deletion is unconditional and permanent; there are no tombstones.

pub mod term;
