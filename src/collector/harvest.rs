//! Per-target harvest loop
//!
//! Opens the target, optionally caps the limit at the advertised total,
//! then alternates extraction and scrolling until the limit is reached, the
//! pager gives up on a stalled page, or the scroll ceiling is hit.

use crate::collector::pacing::pause;
use crate::collector::{Extractor, Pager, Resolver};
use crate::config::{Config, PagerConfig, SourceConfig};
use crate::source::{SourceAdapter, TargetPage};
use crate::state::CollectionSession;
use crate::storage::{EntityId, Record};
use crate::Result;
use std::fmt;
use std::time::Duration;

/// Why a target's session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The record limit was reached
    LimitReached,
    /// The scroll ceiling was hit
    Exhausted,
    /// Nothing was collected within the stall threshold
    Stalled,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LimitReached => "limit reached",
            Self::Exhausted => "source exhausted",
            Self::Stalled => "stalled",
        };
        f.write_str(name)
    }
}

/// What one target's session produced
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub entity_id: EntityId,
    /// Collected records in discovery order
    pub records: Vec<Record>,
    pub scroll_attempts: u32,
    pub end: SessionEnd,
    /// Total count advertised by the page header, when configured and readable
    pub advertised_total: Option<usize>,
}

/// Drives the resolve / extract / scroll loop for single targets
#[derive(Debug, Clone)]
pub struct Harvester {
    source: SourceConfig,
    resolver: Resolver,
    extractor: Extractor,
    pager: PagerConfig,
    settle: Duration,
    seed: Option<u64>,
}

impl Harvester {
    pub fn new(config: &Config) -> Self {
        Self {
            source: config.source.clone(),
            resolver: Resolver::new(&config.resolver),
            extractor: Extractor::new(&config.source, &config.extractor),
            pager: config.pager.clone(),
            settle: config.extractor.settle(),
            seed: None,
        }
    }

    /// Seeds scroll and pause randomness so runs are reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn source_config(&self) -> &SourceConfig {
        &self.source
    }

    /// Builds the page for `entity_id` from the URL template
    pub fn target_page(&self, entity_id: &EntityId) -> Result<TargetPage> {
        Ok(TargetPage {
            entity_id: entity_id.clone(),
            url: self.source.target_url(entity_id)?,
        })
    }

    /// Navigates to the target and waits for the page to settle
    pub async fn open_target<S>(&self, source: &S, entity_id: &EntityId) -> Result<TargetPage>
    where
        S: SourceAdapter + ?Sized,
    {
        let page = self.target_page(entity_id)?;
        source.open(&page).await?;
        pause(self.settle).await;
        Ok(page)
    }

    /// Harvests one target
    ///
    /// # Arguments
    ///
    /// * `source` - The content source, used exclusively for this call
    /// * `entity_id` - The target to harvest
    /// * `limit` - Maximum records to collect; `None` is unbounded
    ///
    /// # Returns
    ///
    /// * `Ok(HarvestReport)` - The session ended normally
    /// * `Err(HarvestError)` - Navigation, total-count resolution, or a
    ///   non-transient source failure
    pub async fn harvest<S>(
        &self,
        source: &S,
        entity_id: &EntityId,
        limit: Option<usize>,
    ) -> Result<HarvestReport>
    where
        S: SourceAdapter + ?Sized,
    {
        let page = self.open_target(source, entity_id).await?;
        tracing::info!("Harvesting {} from {}", entity_id, page.url);

        let mut session = CollectionSession::new(entity_id.clone(), limit);
        let advertised_total = self.read_advertised_total(source).await?;
        if let Some(total) = advertised_total {
            session.cap_limit(total);
        }

        let mut pager = self.pager();
        let end = loop {
            if session.limit_reached() {
                break SessionEnd::LimitReached;
            }

            let candidates = self.extractor.extract_new(source, &mut session).await?;
            let added = session.absorb(candidates);
            if added > 0 {
                tracing::debug!(
                    "{} new records for {} ({} total)",
                    added,
                    entity_id,
                    session.collected().len()
                );
            }

            if session.limit_reached() {
                break SessionEnd::LimitReached;
            }
            if !pager.can_continue(&session) {
                break if session.is_stalled() {
                    SessionEnd::Stalled
                } else {
                    SessionEnd::Exhausted
                };
            }

            pager.advance(source, &mut session).await?;
        };

        let scroll_attempts = session.scroll_attempts();
        let records = session.into_records();
        tracing::info!(
            "Finished {}: {} records after {} scrolls ({})",
            entity_id,
            records.len(),
            scroll_attempts,
            end
        );

        Ok(HarvestReport {
            entity_id: entity_id.clone(),
            records,
            scroll_attempts,
            end,
            advertised_total,
        })
    }

    /// Reads the header count when a total-count query is configured
    async fn read_advertised_total<S>(&self, source: &S) -> Result<Option<usize>>
    where
        S: SourceAdapter + ?Sized,
    {
        let Some(query) = &self.source.total_count_query else {
            return Ok(None);
        };

        let header = self.resolver.resolve(source, query).await?;
        let text = source.read_text(&header).await?;
        let total = text.as_deref().and_then(parse_count);
        match (total, text) {
            (Some(total), _) => tracing::info!("Page advertises {} records", total),
            (None, text) => tracing::debug!("Ignoring total-count header {:?}", text),
        }
        Ok(total)
    }

    fn pager(&self) -> Pager {
        match self.seed {
            Some(seed) => Pager::with_seed(self.pager.clone(), seed),
            None => Pager::new(self.pager.clone()),
        }
    }
}

/// Collects the digits of a count label such as `"1 234 reviews"`
fn parse_count(text: &str) -> Option<usize> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}
