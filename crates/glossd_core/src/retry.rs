//! Bounded exponential backoff for transient storage contention.
//!
//! # Responsibility
//! - Wrap mutating store calls so that write-lock contention is absorbed
//!   invisibly, up to a hard attempt bound.
//!
//! # Invariants
//! - Only errors reporting themselves transient are ever retried.
//! - Backoff delays are non-decreasing between attempts.
//! - The final failed attempt propagates the original error unchanged.

use log::warn;
use std::thread;
use std::time::Duration;

/// Implemented by error types that can distinguish transient contention
/// from permanent failure. Only transient errors are eligible for retry.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Retry schedule for mutating store operations.
///
/// Defaults follow the write path's contract: three attempts total
/// (one initial plus two retries) with a 50 ms base delay doubling per
/// attempt. Read operations are never wrapped; WAL readers do not block
/// behind writers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the initial call.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Multiplier applied to the delay for each further retry.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that performs the initial attempt only.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Sets the total attempt bound (minimum 1).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the delay before the first retry.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Sets the per-retry delay multiplier.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Delay slept before re-invoking after failed attempt `attempt`
    /// (0-indexed): `base_delay * multiplier^attempt`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(self.base_delay.as_secs_f64() * factor)
    }

    /// Invokes `op`, retrying transient failures with backoff.
    ///
    /// Non-transient errors propagate immediately. When the attempt bound
    /// is exhausted the last transient error propagates as
    /// fatal-for-this-request; it is never fatal for the process.
    pub fn run<T, E>(&self, mut op: impl FnMut() -> Result<T, E>) -> Result<T, E>
    where
        E: Transient + std::fmt::Display,
    {
        let mut attempt = 0u32;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt + 1 < self.max_attempts => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        "event=retry module=retry status=backoff attempt={} delay_ms={} error={}",
                        attempt + 1,
                        delay.as_millis(),
                        err
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RetryPolicy, Transient};
    use std::cell::Cell;
    use std::fmt::{Display, Formatter};
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    enum StubError {
        Busy,
        Broken,
    }

    impl Display for StubError {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Busy => write!(f, "database is locked"),
                Self::Broken => write!(f, "disk I/O error"),
            }
        }
    }

    impl Transient for StubError {
        fn is_transient(&self) -> bool {
            matches!(self, Self::Busy)
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::default().with_base_delay(Duration::from_millis(1))
    }

    #[test]
    fn transient_failures_are_absorbed_within_the_bound() {
        let calls = Cell::new(0u32);
        let result = fast_policy().run(|| {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(StubError::Busy)
            } else {
                Ok("stored")
            }
        });

        assert_eq!(result, Ok("stored"));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn exhausted_retries_surface_the_transient_error() {
        let calls = Cell::new(0u32);
        let result: Result<(), StubError> = fast_policy().run(|| {
            calls.set(calls.get() + 1);
            Err(StubError::Busy)
        });

        assert_eq!(result, Err(StubError::Busy));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn permanent_failures_are_never_retried() {
        let calls = Cell::new(0u32);
        let result: Result<(), StubError> = fast_policy().run(|| {
            calls.set(calls.get() + 1);
            Err(StubError::Broken)
        });

        assert_eq!(result, Err(StubError::Broken));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn no_retry_policy_attempts_once() {
        let calls = Cell::new(0u32);
        let result: Result<(), StubError> = RetryPolicy::no_retry().run(|| {
            calls.set(calls.get() + 1);
            Err(StubError::Busy)
        });

        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn backoff_delays_are_non_decreasing() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(50));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));

        let mut previous = Duration::ZERO;
        for attempt in 0..5 {
            let delay = policy.delay_for_attempt(attempt);
            assert!(delay >= previous);
            previous = delay;
        }
    }
}
