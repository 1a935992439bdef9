//! Candidate extraction from the revealed node listing
//!
//! Only nodes past the session's processed offset are inspected. A node
//! whose handle goes stale or whose sub-node vanishes mid-read is skipped
//! on its own; its siblings are still extracted.

use crate::collector::pacing::pause;
use crate::config::{ExtractorConfig, FieldSelector, SourceConfig};
use crate::source::{ScrollTarget, SourceAdapter, SourceResult};
use crate::state::CollectionSession;
use crate::storage::{EntityId, Record};
use crate::Result;
use std::time::Duration;

/// Reads new records out of the revealed listing
#[derive(Debug, Clone)]
pub struct Extractor {
    item_query: String,
    timestamp: FieldSelector,
    rating: FieldSelector,
    node_pause: Duration,
    focus_each_node: bool,
}

impl Extractor {
    pub fn new(source: &SourceConfig, config: &ExtractorConfig) -> Self {
        Self {
            item_query: source.item_query.clone(),
            timestamp: source.timestamp.clone(),
            rating: source.rating.clone(),
            node_pause: config.node_pause(),
            focus_each_node: config.focus_each_node,
        }
    }

    /// Extracts candidates from nodes revealed since the previous call
    ///
    /// The session's processed offset is moved to the size of the listing
    /// whether or not each node produced a record. Once enough new records
    /// to meet the session limit are read, the rest of the listing is left
    /// unread. Nodes without a
    /// timestamp are dropped. Transient per-node failures skip that node;
    /// any other source failure is returned.
    pub async fn extract_new<S>(
        &self,
        source: &S,
        session: &mut CollectionSession<S::Node>,
    ) -> Result<Vec<Record>>
    where
        S: SourceAdapter + ?Sized,
    {
        let nodes = source.revealed_nodes(&self.item_query).await?;
        let start = session.processed_offset();
        let remaining = session.remaining();
        let mut candidates: Vec<Record> = Vec::new();
        let mut fresh = 0;

        for (position, node) in nodes.iter().enumerate().skip(start) {
            if remaining.is_some_and(|wanted| fresh >= wanted) {
                tracing::debug!(
                    "Limit met for {}, leaving nodes {}..{} unread",
                    session.entity_id(),
                    position,
                    nodes.len()
                );
                break;
            }

            match self.read_node(source, node, session.entity_id()).await {
                Ok(Some(record)) => {
                    if session.is_new(&record) && !candidates.iter().any(|c| c.same_key(&record)) {
                        fresh += 1;
                    }
                    candidates.push(record);
                }
                Ok(None) => {
                    tracing::debug!("Node {} has no timestamp, skipped", position);
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!("Skipping node {}: {}", position, e);
                }
                Err(e) => return Err(e.into()),
            }
            pause(self.node_pause).await;
        }

        if nodes.len() > start {
            tracing::debug!(
                "Inspected nodes {}..{} for {}, {} candidates",
                start,
                nodes.len(),
                session.entity_id(),
                candidates.len()
            );
        }

        session.advance_offset(nodes.len());
        session.set_last_revealed(nodes.last().cloned());
        Ok(candidates)
    }

    async fn read_node<S>(
        &self,
        source: &S,
        node: &S::Node,
        entity_id: &EntityId,
    ) -> SourceResult<Option<Record>>
    where
        S: SourceAdapter + ?Sized,
    {
        if self.focus_each_node {
            source.scroll(ScrollTarget::IntoView(node)).await?;
        }

        let Some(timestamp) = read_field(source, node, &self.timestamp).await? else {
            return Ok(None);
        };
        let rating = read_field(source, node, &self.rating).await?;

        Ok(Some(Record::new(entity_id.clone(), timestamp, rating)))
    }
}

/// Reads one field; a missing sub-node or empty value is `None`
async fn read_field<S>(
    source: &S,
    node: &S::Node,
    field: &FieldSelector,
) -> SourceResult<Option<String>>
where
    S: SourceAdapter + ?Sized,
{
    let Some(target) = source.locate_within(node, &field.query).await? else {
        return Ok(None);
    };

    let value = match &field.attribute {
        Some(name) => source.read_attribute(&target, name).await?,
        None => source.read_text(&target).await?,
    };

    Ok(value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}
