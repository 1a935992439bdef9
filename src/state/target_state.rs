/// Target state definitions for tracking batch progress
///
/// This module defines all states a target can be in while a batch runs.
use std::fmt;

/// Represents the current state of one target in a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetState {
    // ===== Active States =====
    /// Target is waiting for its turn
    Pending,

    /// Target is being harvested
    InProgress,

    // ===== Terminal States =====
    /// Harvest ended normally (limit reached, source exhausted or stalled)
    Completed,

    /// Harvest raised an error; later targets still run
    Failed,

    /// Target already had records in the store when its turn came
    Skipped,
}

impl TargetState {
    /// Returns true if no further processing will happen for the target
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }

    /// Returns true if the state may follow `self`
    ///
    /// `Pending -> InProgress | Skipped`, `InProgress -> Completed | Failed`.
    pub fn can_transition_to(&self, next: TargetState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress)
                | (Self::Pending, Self::Skipped)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Failed)
        )
    }

    /// Short lowercase label used in summaries and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Returns all possible target states
    pub fn all_states() -> [Self; 5] {
        [
            Self::Pending,
            Self::InProgress,
            Self::Completed,
            Self::Failed,
            Self::Skipped,
        ]
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
