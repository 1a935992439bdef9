//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `CollectionSession`: transient per-target state (collected records,
//!   inspected offset, scroll attempts, stall flag)
//! - `TargetState`: lifecycle of one target inside a batch

mod session;
mod target_state;

// Re-export main types
pub use session::CollectionSession;
pub use target_state::TargetState;
