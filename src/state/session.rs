//! Per-target collection session
//!
//! A session lives only while one target is being harvested. Nothing in it
//! is persisted directly; its collected records are handed to the store
//! when the target finishes.

use crate::storage::{merge_up_to, EntityId, Record};

/// Transient state of one target's harvest
#[derive(Debug, Clone)]
pub struct CollectionSession<N> {
    entity_id: EntityId,
    collected: Vec<Record>,
    processed_offset: usize,
    scroll_attempts: u32,
    stalled_since_zero: bool,
    limit: Option<usize>,
    last_revealed: Option<N>,
}

impl<N> CollectionSession<N> {
    /// Starts an empty session; `limit` of `None` means unbounded
    pub fn new(entity_id: EntityId, limit: Option<usize>) -> Self {
        Self {
            entity_id,
            collected: Vec::new(),
            processed_offset: 0,
            scroll_attempts: 0,
            stalled_since_zero: false,
            limit,
            last_revealed: None,
        }
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    /// Records in discovery order
    pub fn collected(&self) -> &[Record] {
        &self.collected
    }

    /// Count of revealed nodes already inspected
    pub fn processed_offset(&self) -> usize {
        self.processed_offset
    }

    /// Moves the inspected-node offset forward; it never moves back
    pub fn advance_offset(&mut self, observed: usize) {
        self.processed_offset = self.processed_offset.max(observed);
    }

    pub fn scroll_attempts(&self) -> u32 {
        self.scroll_attempts
    }

    /// Counts one scroll attempt and returns the new total
    pub fn record_scroll(&mut self) -> u32 {
        self.scroll_attempts += 1;
        self.scroll_attempts
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled_since_zero
    }

    pub fn mark_stalled(&mut self) {
        self.stalled_since_zero = true;
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Lowers the limit to `cap` if that is tighter
    pub fn cap_limit(&mut self, cap: usize) {
        self.limit = Some(self.limit.map_or(cap, |limit| limit.min(cap)));
    }

    pub fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.collected.len() >= limit)
    }

    /// Records still wanted before the limit is met; `None` when unbounded
    pub fn remaining(&self) -> Option<usize> {
        self.limit
            .map(|limit| limit.saturating_sub(self.collected.len()))
    }

    /// Whether `record` would add a new key to the collection
    pub fn is_new(&self, record: &Record) -> bool {
        !self.collected.iter().any(|r| r.same_key(record))
    }

    /// Merges candidates, honouring the limit; returns how many were new
    pub fn absorb(&mut self, candidates: Vec<Record>) -> usize {
        merge_up_to(&mut self.collected, candidates, self.limit).len()
    }

    /// The last node seen in the revealed listing
    pub fn last_revealed(&self) -> Option<&N> {
        self.last_revealed.as_ref()
    }

    pub fn set_last_revealed(&mut self, node: Option<N>) {
        if node.is_some() {
            self.last_revealed = node;
        }
    }

    /// Ends the session, yielding its records
    pub fn into_records(self) -> Vec<Record> {
        self.collected
    }
}
