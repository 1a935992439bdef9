//! Collector module: the incremental harvest engine
//!
//! This module contains the per-target collection logic, including:
//! - A bounded retry combinator and the element resolver built on it
//! - The scroll pager with stall detection
//! - Extraction of new records from the revealed listing
//! - The harvest loop tying them together for one target

mod extractor;
mod harvest;
mod pacing;
mod pager;
mod resolver;
mod retry;
mod state_dump;

pub use extractor::Extractor;
pub use harvest::{HarvestReport, Harvester, SessionEnd};
pub use pacing::{pause, DelayRange};
pub use pager::{Pager, ScrollOutcome, ScrollTactic};
pub use resolver::Resolver;
pub use retry::{RetryError, RetryPolicy};
pub use state_dump::dump_state;
