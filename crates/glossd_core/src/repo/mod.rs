//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Every mutating call commits a single atomic transaction; no
//!   multi-statement transaction spans a protocol request.
//! - Repository APIs return semantic errors (`Duplicate`, `NotFound`,
//!   `Contention`) in addition to DB transport errors.

pub mod term_repo;
