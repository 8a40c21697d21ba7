//! Wire front-ends for the glossd term store.
//!
//! Hosts two independent protocol adapters — an HTTP/JSON gateway and a
//! binary RPC server — bound to ONE shared glossary core. Both adapters
//! are stateless translation layers; neither holds storage state nor
//! duplicates business rules.

use glossd_core::{GlossaryError, GlossaryResult, GlossaryService, RepoError, SqliteTermRepository};
use std::sync::Arc;

pub mod config;
pub mod http;
pub mod rpc;

/// The one core instance both adapters translate into.
pub type CoreService = GlossaryService<SqliteTermRepository>;

/// Shared handle to the core, cloned into request tasks.
pub type SharedService = Arc<CoreService>;

/// Runs one core call on the blocking thread pool.
///
/// Storage work is synchronous rusqlite; it must not run on the async
/// workers that drive connection I/O.
pub(crate) async fn call_blocking<T>(
    service: &SharedService,
    op: impl FnOnce(&CoreService) -> GlossaryResult<T> + Send + 'static,
) -> GlossaryResult<T>
where
    T: Send + 'static,
{
    let service = Arc::clone(service);
    match tokio::task::spawn_blocking(move || op(&service)).await {
        Ok(result) => result,
        Err(_join_error) => Err(GlossaryError::Storage(RepoError::InvalidData(
            "request worker panicked".to_string(),
        ))),
    }
}
