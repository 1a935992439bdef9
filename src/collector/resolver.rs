//! Bounded-retry element resolution
//!
//! Rendering is asynchronous, so a single lookup is unreliable. One attempt
//! polls the source until the element shows up or the attempt times out;
//! the [`RetryPolicy`] repeats attempts that failed for transient reasons
//! (element absent, handle gone stale) and gives up after a fixed count.

use crate::collector::retry::{RetryError, RetryPolicy};
use crate::config::ResolverConfig;
use crate::source::{SourceAdapter, SourceError, SourceResult};
use crate::{HarvestError, Result};
use std::time::Duration;

/// Locates nodes with bounded retries
#[derive(Debug, Clone)]
pub struct Resolver {
    policy: RetryPolicy,
    timeout: Duration,
    poll_interval: Duration,
}

impl Resolver {
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            policy: RetryPolicy::new(config.attempts, config.backoff()),
            timeout: config.timeout(),
            poll_interval: config.poll_interval(),
        }
    }

    /// Resolves `query` to a node
    ///
    /// # Returns
    ///
    /// * `Ok(node)` - The first matching node
    /// * `Err(HarvestError::ResolutionFailed)` - Every attempt timed out or
    ///   hit a stale handle
    /// * `Err(HarvestError::Source)` - Any other source failure, unretried
    pub async fn resolve<S>(&self, source: &S, query: &str) -> Result<S::Node>
    where
        S: SourceAdapter + ?Sized,
    {
        let outcome = self
            .policy
            .run(|| self.attempt(source, query), SourceError::is_transient)
            .await;

        match outcome {
            Ok(node) => Ok(node),
            Err(RetryError::Exhausted { attempts, last }) => {
                tracing::warn!("Could not resolve {:?} after {} attempts: {}", query, attempts, last);
                Err(HarvestError::ResolutionFailed {
                    query: query.to_string(),
                    attempts,
                })
            }
            Err(RetryError::Fatal(e)) => Err(e.into()),
        }
    }

    /// One attempt: poll until found or until the attempt's timeout expires
    async fn attempt<S>(&self, source: &S, query: &str) -> SourceResult<S::Node>
    where
        S: SourceAdapter + ?Sized,
    {
        let poll = async {
            loop {
                if let Some(node) = source.locate(query).await? {
                    return Ok(node);
                }
                if self.poll_interval.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        };

        match tokio::time::timeout(self.timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::NotFound(query.to_string())),
        }
    }
}
