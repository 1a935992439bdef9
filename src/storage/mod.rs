//! Storage module for persisting harvested records
//!
//! This module handles:
//! - The record and target identifier types
//! - Deduplicating merges keyed on `(timestamp, entityId)`
//! - The JSON checkpoint store, rewritten in full after each target

mod checkpoint;
mod merge;
mod record;
mod traits;

pub(crate) use checkpoint::atomic_write;
pub use checkpoint::{load_store, Checkpointer, PersistedStore};
pub use merge::{merge, merge_up_to};
pub use record::{DedupKey, EntityId, Record};
pub use traits::{RecordStore, StorageError, StorageResult};
