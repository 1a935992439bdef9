//! Deduplicating merge of candidate records into a collection

use crate::storage::record::{DedupKey, Record};
use std::collections::HashSet;

/// Appends every candidate whose dedup key is not yet in `existing`
///
/// Existing order is preserved and new records follow in candidate order.
/// Duplicates among the candidates themselves collapse to the first one, so
/// merging the same candidates twice never grows the collection.
///
/// Returns the slice of records that were appended.
pub fn merge<I>(existing: &mut Vec<Record>, candidates: I) -> &[Record]
where
    I: IntoIterator<Item = Record>,
{
    merge_up_to(existing, candidates, None)
}

/// Same as [`merge`], but stops once `existing` holds `cap` records
pub fn merge_up_to<I>(existing: &mut Vec<Record>, candidates: I, cap: Option<usize>) -> &[Record]
where
    I: IntoIterator<Item = Record>,
{
    let before = existing.len();
    let mut seen: HashSet<DedupKey> = existing.iter().map(Record::dedup_key).collect();

    for candidate in candidates {
        if cap.is_some_and(|cap| existing.len() >= cap) {
            break;
        }
        if seen.insert(candidate.dedup_key()) {
            existing.push(candidate);
        }
    }

    &existing[before..]
}
