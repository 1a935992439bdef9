//! Batch orchestration across many targets
//!
//! Targets run strictly one after another against the single source.
//! Each one moves through `Pending -> InProgress -> Completed | Failed` or
//! straight to `Skipped` when the store already holds its records. A failed
//! target never stops the batch. The inter-target delay follows a processed
//! target only while some later target is still missing from the store.

use crate::collector::{pause, DelayRange, Harvester, SessionEnd};
use crate::source::SourceAdapter;
use crate::state::TargetState;
use crate::storage::{EntityId, RecordStore};
use crate::{HarvestError, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{Duration, Instant};

/// Final state of one target
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub entity_id: EntityId,
    pub state: TargetState,
    /// Records collected during the session
    pub collected: usize,
    /// Records that were new to the store
    pub persisted: usize,
    /// How the session ended, for completed targets
    pub end: Option<SessionEnd>,
    /// Failure description, for failed targets
    pub error: Option<String>,
}

impl TargetOutcome {
    fn skipped(entity_id: EntityId) -> Self {
        Self {
            entity_id,
            state: TargetState::Skipped,
            collected: 0,
            persisted: 0,
            end: None,
            error: None,
        }
    }
}

/// Per-target outcomes of one batch run, in target order
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<TargetOutcome>,
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn count(&self, state: TargetState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }

    pub fn completed(&self) -> usize {
        self.count(TargetState::Completed)
    }

    pub fn failed(&self) -> usize {
        self.count(TargetState::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(TargetState::Skipped)
    }

    /// Records added to the store over the whole batch
    pub fn total_persisted(&self) -> usize {
        self.outcomes.iter().map(|o| o.persisted).sum()
    }

    pub fn outcome(&self, id: &EntityId) -> Option<&TargetOutcome> {
        self.outcomes.iter().find(|o| &o.entity_id == id)
    }
}

/// Runs the harvester over a list of targets, checkpointing after each
pub struct BatchOrchestrator<'a, S: ?Sized, R> {
    harvester: &'a Harvester,
    source: &'a S,
    store: &'a mut R,
    rng: StdRng,
}

impl<'a, S, R> BatchOrchestrator<'a, S, R>
where
    S: SourceAdapter + ?Sized,
    R: RecordStore,
{
    pub fn new(harvester: &'a Harvester, source: &'a S, store: &'a mut R) -> Self {
        Self {
            harvester,
            source,
            store,
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeds the inter-target delay draws
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Processes every target in order
    ///
    /// # Arguments
    ///
    /// * `targets` - Target identifiers, already de-duplicated
    /// * `limit` - Per-target record limit
    /// * `delay` - Pause range between targets that touched the source
    ///
    /// # Returns
    ///
    /// The per-target summary. Per-target failures are recorded in the
    /// summary, never returned.
    pub async fn run(
        &mut self,
        targets: &[EntityId],
        limit: Option<usize>,
        delay: DelayRange,
    ) -> Result<BatchSummary> {
        let started = Instant::now();
        let mut outcomes = Vec::with_capacity(targets.len());
        tracing::info!("Starting batch of {} targets", targets.len());

        for (index, entity_id) in targets.iter().enumerate() {
            let state = TargetState::Pending;

            // Checked at the target's turn so earlier entries of this run count too
            if self.store.contains_entity(entity_id) {
                transition(entity_id, state, TargetState::Skipped)?;
                tracing::info!("Skipping {}: already in store", entity_id);
                outcomes.push(TargetOutcome::skipped(entity_id.clone()));
                continue;
            }

            let state = transition(entity_id, state, TargetState::InProgress)?;
            tracing::info!("[{}/{}] Processing {}", index + 1, targets.len(), entity_id);

            let outcome = match self.process(entity_id, limit).await {
                Ok((collected, persisted, end)) => TargetOutcome {
                    entity_id: entity_id.clone(),
                    state: transition(entity_id, state, TargetState::Completed)?,
                    collected,
                    persisted,
                    end: Some(end),
                    error: None,
                },
                Err(e) => {
                    tracing::error!("Target {} failed: {}", entity_id, e);
                    TargetOutcome {
                        entity_id: entity_id.clone(),
                        state: transition(entity_id, state, TargetState::Failed)?,
                        collected: 0,
                        persisted: 0,
                        end: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);

            // Only pause when a later target will actually use the source
            let more_work = targets[index + 1..]
                .iter()
                .any(|next| !self.store.contains_entity(next));
            if more_work {
                let wait = delay.sample(&mut self.rng);
                if !wait.is_zero() {
                    tracing::debug!("Waiting {:?} before next target", wait);
                }
                pause(wait).await;
            }
        }

        let summary = BatchSummary {
            outcomes,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            "Batch finished: {} completed, {} failed, {} skipped, {} new records",
            summary.completed(),
            summary.failed(),
            summary.skipped(),
            summary.total_persisted()
        );
        Ok(summary)
    }

    /// Harvests one target, merges its records, and checkpoints the store
    async fn process(
        &mut self,
        entity_id: &EntityId,
        limit: Option<usize>,
    ) -> Result<(usize, usize, SessionEnd)> {
        let report = self.harvester.harvest(self.source, entity_id, limit).await?;
        let collected = report.records.len();
        let persisted = self.store.absorb(report.records);
        self.store.flush()?;
        Ok((collected, persisted, report.end))
    }
}

fn transition(entity_id: &EntityId, from: TargetState, to: TargetState) -> Result<TargetState> {
    if from.can_transition_to(to) {
        Ok(to)
    } else {
        Err(HarvestError::InvalidTransition {
            target: entity_id.to_string(),
            from,
            to,
        })
    }
}
