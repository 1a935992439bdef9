//! Bounded retry combinator
//!
//! Runs an async operation up to a fixed number of times, pausing between
//! attempts. A caller-supplied predicate decides which failures are worth
//! another attempt; any other failure is returned at once.

use crate::collector::pacing::pause;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// How a retried operation ultimately failed
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error; `last` is the final one
    Exhausted { attempts: u32, last: E },

    /// A non-retryable error ended the loop early
    Fatal(E),
}

impl<E> RetryError<E> {
    /// The underlying error, whichever way the loop ended
    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { last, .. } => last,
            Self::Fatal(e) => e,
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { attempts, last } => {
                write!(f, "gave up after {} attempts: {}", attempts, last)
            }
            Self::Fatal(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Exhausted { last, .. } => Some(last),
            Self::Fatal(e) => Some(e),
        }
    }
}

/// Attempt bound plus the pause between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// Creates a policy; at least one attempt is always made
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Runs `op` until it succeeds, fails fatally, or attempts run out
    ///
    /// # Arguments
    ///
    /// * `op` - Produces a fresh future for each attempt
    /// * `is_retryable` - Returns true for errors that deserve another attempt
    ///
    /// # Returns
    ///
    /// * `Ok(T)` - The first successful result
    /// * `Err(RetryError::Fatal)` - A non-retryable error, returned immediately
    /// * `Err(RetryError::Exhausted)` - `max_attempts` retryable failures
    pub async fn run<T, E, F, Fut, P>(&self, mut op: F, is_retryable: P) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: fmt::Display,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !is_retryable(&e) => return Err(RetryError::Fatal(e)),
                Err(e) if attempt >= self.max_attempts => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: e,
                    })
                }
                Err(e) => {
                    tracing::debug!(
                        "Attempt {}/{} failed: {}; retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        e,
                        self.backoff
                    );
                    pause(self.backoff).await;
                }
            }
        }
    }
}
