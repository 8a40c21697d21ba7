//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into protocol-agnostic glossary APIs.
//! - Keep wire adapters decoupled from storage details.

pub mod glossary_service;
