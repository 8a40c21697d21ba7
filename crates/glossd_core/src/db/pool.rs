//! Bounded SQLite connection pool.
//!
//! # Responsibility
//! - Hand out bootstrapped connections to one database file.
//! - Enforce a hard ceiling (base size plus a smaller overflow allowance
//!   for bursts) on simultaneously open connections.
//! - Verify connection health on checkout and replace stale connections.
//!
//! # Invariants
//! - Pool checkout is the only synchronization point in the storage layer.
//! - Overflow connections are closed on return instead of idling.
//! - A connection that fails its health probe never reaches a caller.

use super::open::{open_db, DbSettings};
use super::DbError;
use log::{info, warn};
use parking_lot::{Condvar, Mutex};
use rusqlite::Connection;
use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Configuration for the connection pool.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Connections kept open and idle for reuse.
    pub max_size: usize,
    /// Additional connections allowed during bursts.
    pub max_overflow: usize,
    /// Maximum wait for a free slot before checkout fails.
    pub acquire_timeout: Duration,
    /// Per-connection settings applied at open time.
    pub settings: DbSettings,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 20,
            max_overflow: 50,
            acquire_timeout: Duration::from_secs(30),
            settings: DbSettings::default(),
        }
    }
}

impl PoolConfig {
    /// Sets the base pool size.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets the overflow allowance.
    pub fn with_max_overflow(mut self, max_overflow: usize) -> Self {
        self.max_overflow = max_overflow;
        self
    }

    /// Sets the checkout wait bound.
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Sets the per-connection settings.
    pub fn with_settings(mut self, settings: DbSettings) -> Self {
        self.settings = settings;
        self
    }

    fn ceiling(&self) -> usize {
        self.max_size + self.max_overflow
    }
}

/// Errors surfaced by pool checkout.
#[derive(Debug)]
pub enum PoolError {
    /// The ceiling was reached and no connection freed up in time.
    Exhausted { waited: Duration },
    /// Opening or re-opening a connection failed.
    Open(DbError),
}

impl Display for PoolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exhausted { waited } => {
                write!(f, "connection pool exhausted after {}ms", waited.as_millis())
            }
            Self::Open(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PoolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Exhausted { .. } => None,
            Self::Open(err) => Some(err),
        }
    }
}

impl From<DbError> for PoolError {
    fn from(value: DbError) -> Self {
        Self::Open(value)
    }
}

/// Point-in-time pool accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Connections currently open (idle + checked out).
    pub total: usize,
    /// Connections idle and ready for reuse.
    pub idle: usize,
}

struct PoolState {
    idle: VecDeque<Connection>,
    total: usize,
}

/// Bounded pool of bootstrapped connections to one database file.
pub struct ConnectionPool {
    path: PathBuf,
    config: PoolConfig,
    state: Mutex<PoolState>,
    available: Condvar,
}

impl ConnectionPool {
    /// Opens the pool against a database file.
    ///
    /// One connection is opened eagerly so that open failures and pending
    /// migrations surface here instead of on the first request.
    pub fn open(path: impl AsRef<Path>, config: PoolConfig) -> Result<Arc<Self>, PoolError> {
        let path = path.as_ref().to_path_buf();
        let first = open_db(&path, config.settings)?;

        let mut idle = VecDeque::with_capacity(config.max_size);
        idle.push_back(first);

        info!(
            "event=pool_open module=db status=ok max_size={} max_overflow={}",
            config.max_size, config.max_overflow
        );

        Ok(Arc::new(Self {
            path,
            config,
            state: Mutex::new(PoolState { idle, total: 1 }),
            available: Condvar::new(),
        }))
    }

    /// Checks a connection out of the pool.
    ///
    /// Idle connections are health-verified before reuse; a stale one is
    /// dropped and replaced by a freshly opened connection. When the
    /// ceiling is reached the call blocks until a connection is returned
    /// or the acquire timeout elapses.
    pub fn checkout(&self) -> Result<PooledConnection<'_>, PoolError> {
        let deadline = Instant::now() + self.config.acquire_timeout;
        let mut state = self.state.lock();

        loop {
            if let Some(conn) = state.idle.pop_front() {
                drop(state);
                return self.verify_or_replace(conn);
            }

            if state.total < self.config.ceiling() {
                state.total += 1;
                drop(state);
                return self.open_slot();
            }

            if self.available.wait_until(&mut state, deadline).timed_out() {
                // A return may have raced the timeout; take it if so.
                if let Some(conn) = state.idle.pop_front() {
                    drop(state);
                    return self.verify_or_replace(conn);
                }
                warn!(
                    "event=pool_checkout module=db status=error error_code=pool_exhausted waited_ms={}",
                    self.config.acquire_timeout.as_millis()
                );
                return Err(PoolError::Exhausted {
                    waited: self.config.acquire_timeout,
                });
            }
        }
    }

    /// Returns current pool accounting, for diagnostics and tests.
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            total: state.total,
            idle: state.idle.len(),
        }
    }

    fn verify_or_replace(&self, conn: Connection) -> Result<PooledConnection<'_>, PoolError> {
        if connection_is_healthy(&conn) {
            return Ok(PooledConnection::new(self, conn));
        }

        warn!("event=pool_checkout module=db status=replace error_code=stale_connection");
        drop(conn);
        self.open_slot()
    }

    fn open_slot(&self) -> Result<PooledConnection<'_>, PoolError> {
        match open_db(&self.path, self.config.settings) {
            Ok(conn) => Ok(PooledConnection::new(self, conn)),
            Err(err) => {
                let mut state = self.state.lock();
                state.total -= 1;
                drop(state);
                self.available.notify_one();
                Err(PoolError::Open(err))
            }
        }
    }

    fn give_back(&self, conn: Connection) {
        let surplus;
        {
            let mut state = self.state.lock();
            if state.idle.len() < self.config.max_size {
                state.idle.push_back(conn);
                surplus = None;
            } else {
                state.total -= 1;
                surplus = Some(conn);
            }
        }
        // Closing a surplus overflow connection happens outside the lock.
        drop(surplus);
        self.available.notify_one();
    }
}

/// A connection checked out of a [`ConnectionPool`].
///
/// Dereferences to [`rusqlite::Connection`] and returns itself to the pool
/// on drop.
pub struct PooledConnection<'pool> {
    pool: &'pool ConnectionPool,
    conn: Option<Connection>,
}

impl<'pool> PooledConnection<'pool> {
    fn new(pool: &'pool ConnectionPool, conn: Connection) -> Self {
        Self {
            pool,
            conn: Some(conn),
        }
    }
}

impl std::fmt::Debug for PooledConnection<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("checked_out", &self.conn.is_some())
            .finish()
    }
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn
            .as_ref()
            .expect("pooled connection accessed after return")
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn
            .as_mut()
            .expect("pooled connection accessed after return")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.give_back(conn);
        }
    }
}

fn connection_is_healthy(conn: &Connection) -> bool {
    conn.query_row("SELECT 1;", [], |row| row.get::<_, i64>(0))
        .is_ok()
}
