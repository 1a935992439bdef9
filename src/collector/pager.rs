//! Scroll strategy with stall detection
//!
//! Each advance performs one scroll, cycling through three tactics keyed by
//! the attempt count, then pauses for a random interval. A single fixed
//! tactic tends to get stuck against lazy-loading thresholds.

use crate::collector::pacing::pause;
use crate::config::PagerConfig;
use crate::source::{ScrollTarget, SourceAdapter};
use crate::state::CollectionSession;
use crate::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;

/// One of the three scroll moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollTactic {
    /// Scroll down by the configured fixed offset
    FixedOffset,
    /// Bring the last revealed node into view
    LastNode,
    /// Scroll down by a random offset within the configured range
    RandomOffset,
}

impl ScrollTactic {
    /// Tactic used for the given number of completed attempts
    pub fn for_attempt(attempts: u32) -> Self {
        match attempts % 3 {
            0 => Self::FixedOffset,
            1 => Self::LastNode,
            _ => Self::RandomOffset,
        }
    }
}

impl fmt::Display for ScrollTactic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FixedOffset => "fixed-offset",
            Self::LastNode => "last-node",
            Self::RandomOffset => "random-offset",
        };
        f.write_str(name)
    }
}

/// Result of one [`Pager::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollOutcome {
    /// The collection grew since the previous advance
    pub progressed: bool,
    pub tactic: ScrollTactic,
    /// Attempts made so far, including this one
    pub attempts: u32,
}

/// Stateful scroll driver for one target
#[derive(Debug)]
pub struct Pager {
    config: PagerConfig,
    rng: StdRng,
    collected_at_last_advance: usize,
}

impl Pager {
    pub fn new(config: PagerConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic pager for reproducible runs
    pub fn with_seed(config: PagerConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: PagerConfig, rng: StdRng) -> Self {
        Self {
            config,
            rng,
            collected_at_last_advance: 0,
        }
    }

    /// Whether another scroll is allowed for this session
    pub fn can_continue<N>(&self, session: &CollectionSession<N>) -> bool {
        !session.is_stalled() && session.scroll_attempts() < self.config.max_scroll_attempts
    }

    /// Performs one scroll tactic and the pause that follows it
    ///
    /// Marks the session stalled once attempts exceed the stall threshold
    /// while nothing has been collected.
    pub async fn advance<S>(
        &mut self,
        source: &S,
        session: &mut CollectionSession<S::Node>,
    ) -> Result<ScrollOutcome>
    where
        S: SourceAdapter + ?Sized,
    {
        let tactic = ScrollTactic::for_attempt(session.scroll_attempts());
        match tactic {
            ScrollTactic::FixedOffset => {
                source.scroll(ScrollTarget::By(self.config.fixed_offset)).await?;
            }
            ScrollTactic::LastNode => match session.last_revealed() {
                Some(node) => source.scroll(ScrollTarget::IntoView(node)).await?,
                None => source.scroll(ScrollTarget::By(self.config.fixed_offset)).await?,
            },
            ScrollTactic::RandomOffset => {
                let offset = self
                    .rng
                    .gen_range(self.config.random_offset_min..=self.config.random_offset_max);
                source.scroll(ScrollTarget::By(offset)).await?;
            }
        }

        let wait = self.config.pause().sample(&mut self.rng);
        pause(wait).await;

        let attempts = session.record_scroll();
        let collected = session.collected().len();
        tracing::debug!(
            "Scroll {} ({}) for {}, {} records so far",
            attempts,
            tactic,
            session.entity_id(),
            collected
        );

        if attempts > self.config.stall_threshold && collected == 0 && !session.is_stalled() {
            tracing::warn!(
                "No records for {} after {} scrolls, abandoning target",
                session.entity_id(),
                attempts
            );
            session.mark_stalled();
        }

        if self.config.progress_every > 0 && attempts % self.config.progress_every == 0 {
            tracing::info!(
                "Progress for {}: {} scrolls, {} records",
                session.entity_id(),
                attempts,
                collected
            );
        }

        let progressed = collected > self.collected_at_last_advance;
        self.collected_at_last_advance = collected;

        Ok(ScrollOutcome {
            progressed,
            tactic,
            attempts,
        })
    }
}
