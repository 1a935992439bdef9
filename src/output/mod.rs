//! Output module for reporting harvest results
//!
//! This module handles:
//! - Printing the per-target summary of a batch
//! - Computing and printing statistics of the persisted store

pub mod stats;
mod summary;

pub use stats::{load_statistics, print_statistics, StoreStatistics};
pub use summary::print_batch_summary;
