//! Storage traits and error types
//!
//! This module defines the trait interface for record stores and
//! associated error types.

use crate::storage::{EntityId, Record};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store exists but could not be read
    #[error("Failed to read store {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The store exists but its content is not a record collection.
    /// Overwriting it would silently lose data, so this is always surfaced.
    #[error("Store {} is not a valid record collection: {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to encode records: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to write store {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for durable record collections
///
/// The batch orchestrator talks to its store only through this trait, so
/// checkpointing policy stays in one place.
pub trait RecordStore {
    /// All persisted records, in insertion order
    fn records(&self) -> &[Record];

    /// Whether any record for this target is already persisted
    fn contains_entity(&self, id: &EntityId) -> bool;

    /// Merges freshly collected records, returning how many were new
    fn absorb(&mut self, records: Vec<Record>) -> usize;

    /// Writes the full collection to durable storage
    fn flush(&mut self) -> StorageResult<()>;
}
