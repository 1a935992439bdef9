//! Review-Harvester: an incremental collector for progressively revealed records
//!
//! This crate drives a scroll-revealed content source, extracts each record
//! exactly once, and checkpoints the collection to a JSON store so that
//! interrupted batches resume where they left off.

pub mod batch;
pub mod collector;
pub mod config;
pub mod output;
pub mod source;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Review-Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Source error: {0}")]
    Source(#[from] source::SourceError),

    #[error("Element not found after {attempts} attempts: {query}")]
    ResolutionFailed { query: String, attempts: u32 },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Invalid target identifier: {0:?}")]
    InvalidTarget(String),

    #[error("Invalid state transition for {target}: {from} -> {to}")]
    InvalidTransition {
        target: String,
        from: state::TargetState,
        to: state::TargetState,
    },

    #[error("Embedded state is not valid JSON: {0}")]
    StateDecode(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL template: {0}")]
    InvalidTemplate(String),
}

/// Result type alias for Review-Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use batch::{BatchOrchestrator, BatchSummary};
pub use collector::{Harvester, Resolver};
pub use config::Config;
pub use source::{SourceAdapter, SourceError};
pub use state::{CollectionSession, TargetState};
pub use storage::{Checkpointer, EntityId, PersistedStore, Record};
