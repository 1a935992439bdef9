//! Batch module: harvesting a list of targets with per-target isolation

mod orchestrator;
mod targets;

pub use orchestrator::{BatchOrchestrator, BatchSummary, TargetOutcome};
pub use targets::{dedup_targets, parse_target_list, read_target_file};
