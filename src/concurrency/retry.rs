//! Caller-controlled retry loops for optimistic operations.
//!
//! [`FixedAtomicWordGroup::load`](crate::FixedAtomicWordGroup::load) and
//! [`compare_exchange`](crate::FixedAtomicWordGroup::compare_exchange) report
//! a lost race as `false` and never loop on their own. A [`RetryPolicy`]
//! decides how often to try again and how to wait in between.
//!
//! Policies are plain data and can be loaded from configuration:
//!
//! ```rust
//! use xact::{BackoffStrategy, RetryPolicy};
//!
//! let policy = RetryPolicy::from_json(r#"{ "max_attempts": 64, "backoff": "yield" }"#).unwrap();
//! assert_eq!(policy, RetryPolicy::bounded(64).with_backoff(BackoffStrategy::Yield));
//! ```

use core::fmt;

use crossbeam_utils::Backoff;
use serde::{Deserialize, Serialize};

use crate::loom::hint::spin_loop;
use crate::loom::thread::yield_now;

/// How a [`RetryPolicy`] waits between two failed attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Issue a single CPU spin hint and retry.
    Spin,
    /// Spin with exponentially growing pauses, then yield to the scheduler.
    #[default]
    Exponential,
    /// Yield the thread's time slice on every retry.
    Yield,
}

/// Bounds and pacing for retrying an optimistic operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of attempts, or `None` to retry until success.
    ///
    /// At least one attempt is always made, even when this is `Some(0)`.
    pub max_attempts: Option<u32>,
    /// Pause between attempts.
    pub backoff: BackoffStrategy,
}

impl RetryPolicy {
    /// A policy that retries until the operation succeeds.
    pub const fn unbounded() -> Self {
        Self {
            max_attempts: None,
            backoff: BackoffStrategy::Exponential,
        }
    }

    /// A policy that gives up after `max_attempts` attempts.
    pub const fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            backoff: BackoffStrategy::Exponential,
        }
    }

    /// Replaces the backoff strategy.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Parses a policy from JSON. Missing fields take their default values.
    ///
    /// # Errors
    /// Returns the `serde_json` error for malformed input or unknown strategies.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Runs `attempt` until it returns `Some`, pausing between failures.
    ///
    /// # Errors
    /// Returns [`RetryError::Exhausted`] once `max_attempts` attempts have failed.
    pub fn run<T, F>(&self, mut attempt: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Option<T>,
    {
        let backoff = Backoff::new();
        let mut attempts: u32 = 0;
        loop {
            if let Some(out) = attempt() {
                return Ok(out);
            }
            attempts = attempts.saturating_add(1);
            if let Some(max) = self.max_attempts {
                if attempts >= max {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(attempts, backoff = ?self.backoff, "retry policy exhausted");
                    return Err(RetryError::Exhausted { attempts });
                }
            }
            self.pause(&backoff);
        }
    }

    #[inline]
    fn pause(&self, backoff: &Backoff) {
        match self.backoff {
            BackoffStrategy::Spin => spin_loop(),
            BackoffStrategy::Exponential => backoff.snooze(),
            BackoffStrategy::Yield => yield_now(),
        }
    }
}

/// The error returned when a bounded [`RetryPolicy`] runs out of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryError {
    /// Every permitted attempt lost its race.
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
    },
}

impl fmt::Display for RetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { attempts } => {
                write!(f, "operation still contended after {attempts} attempts")
            }
        }
    }
}

impl std::error::Error for RetryError {}
