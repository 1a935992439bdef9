//! Statistics over a persisted record store
//!
//! This module provides functionality for summarising and displaying the
//! contents of the JSON store without modifying it.

use crate::storage::{EntityId, PersistedStore};
use chrono::{DateTime, FixedOffset};
use std::collections::{BTreeMap, HashMap};

/// Label used for records without a rating
const UNRATED: &str = "unrated";

/// Store statistics summary
#[derive(Debug, Clone, Default)]
pub struct StoreStatistics {
    /// Total number of records
    pub total_records: usize,

    /// Record count per target, in first-seen order
    pub records_per_entity: Vec<(EntityId, usize)>,

    /// Record count per rating value
    pub rating_distribution: BTreeMap<String, usize>,

    /// Earliest and latest timestamp
    pub timestamp_span: Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)>,

    /// Records whose timestamp is not RFC 3339
    pub unparsed_timestamps: usize,
}

/// Computes statistics for a loaded store
pub fn load_statistics(store: &PersistedStore) -> StoreStatistics {
    let mut order: Vec<EntityId> = Vec::new();
    let mut per_entity: HashMap<&EntityId, usize> = HashMap::new();
    let mut rating_distribution = BTreeMap::new();
    let mut timestamp_span: Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> = None;
    let mut unparsed_timestamps = 0;

    for record in store.records() {
        let count = per_entity.entry(&record.entity_id).or_insert(0);
        if *count == 0 {
            order.push(record.entity_id.clone());
        }
        *count += 1;

        let rating = record
            .rating_value
            .clone()
            .unwrap_or_else(|| UNRATED.to_string());
        *rating_distribution.entry(rating).or_insert(0) += 1;

        match DateTime::parse_from_rfc3339(&record.timestamp) {
            Ok(at) => {
                timestamp_span = Some(match timestamp_span {
                    None => (at, at),
                    Some((first, last)) => (first.min(at), last.max(at)),
                });
            }
            Err(_) => unparsed_timestamps += 1,
        }
    }

    let records_per_entity = order
        .into_iter()
        .map(|id| {
            let count = per_entity.get(&id).copied().unwrap_or(0);
            (id, count)
        })
        .collect();

    StoreStatistics {
        total_records: store.len(),
        records_per_entity,
        rating_distribution,
        timestamp_span,
        unparsed_timestamps,
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");

    println!("Overview:");
    println!("  Total records: {}", stats.total_records);
    println!("  Targets: {}", stats.records_per_entity.len());
    if let Some((first, last)) = &stats.timestamp_span {
        println!(
            "  Published: {} .. {} ({} days)",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d"),
            (*last - *first).num_days()
        );
    }
    if stats.unparsed_timestamps > 0 {
        println!("  Unparsed timestamps: {}", stats.unparsed_timestamps);
    }
    println!();

    if !stats.records_per_entity.is_empty() {
        println!("Records per Target:");
        for (id, count) in &stats.records_per_entity {
            println!("  {}: {}", id, count);
        }
        println!();
    }

    if !stats.rating_distribution.is_empty() {
        println!("Rating Distribution:");
        for (rating, count) in &stats.rating_distribution {
            let percentage = (*count as f64 / stats.total_records as f64) * 100.0;
            println!("  {}: {} ({:.1}%)", rating, count, percentage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Record;

    fn record(id: &str, timestamp: &str, rating: Option<&str>) -> Record {
        Record::new(
            EntityId::new(id).unwrap(),
            timestamp,
            rating.map(str::to_string),
        )
    }

    #[test]
    fn test_statistics() {
        let store = PersistedStore::from_records(vec![
            record("20", "2024-02-01T08:00:00.000Z", Some("5")),
            record("10", "2023-12-24T19:30:00+03:00", Some("4")),
            record("20", "2024-03-15T12:00:00Z", Some("5")),
            record("20", "yesterday", None),
        ]);

        let stats = load_statistics(&store);

        assert_eq!(stats.total_records, 4);
        assert_eq!(
            stats.records_per_entity,
            vec![
                (EntityId::new("20").unwrap(), 3),
                (EntityId::new("10").unwrap(), 1)
            ]
        );
        assert_eq!(stats.rating_distribution.get("5"), Some(&2));
        assert_eq!(stats.rating_distribution.get(UNRATED), Some(&1));
        let (first, last) = stats.timestamp_span.unwrap();
        assert_eq!(first.to_rfc3339(), "2023-12-24T19:30:00+03:00");
        assert_eq!(last.to_rfc3339(), "2024-03-15T12:00:00+00:00");
        assert_eq!(stats.unparsed_timestamps, 1);
    }

    #[test]
    fn test_empty_store() {
        let stats = load_statistics(&PersistedStore::new());
        assert_eq!(stats.total_records, 0);
        assert!(stats.records_per_entity.is_empty());
        assert!(stats.timestamp_span.is_none());
    }
}
