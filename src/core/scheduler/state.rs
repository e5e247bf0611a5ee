//! Scheduler states.

use serde::{Deserialize, Serialize};

/// Where the scheduler is in its cycle
///
/// `Idle → Fetching → Filtering → Deduping → Publishing → Cooling → Idle`.
/// `Error` is entered from `Fetching` or `Publishing` and leads back to
/// `Idle`. `Shutdown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerState {
    Idle,
    Fetching,
    Filtering,
    Deduping,
    Publishing,
    Cooling,
    Error,
    Shutdown,
}

impl SchedulerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SchedulerState::Shutdown)
    }
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerState::Idle => write!(f, "Idle"),
            SchedulerState::Fetching => write!(f, "Fetching"),
            SchedulerState::Filtering => write!(f, "Filtering"),
            SchedulerState::Deduping => write!(f, "Deduping"),
            SchedulerState::Publishing => write!(f, "Publishing"),
            SchedulerState::Cooling => write!(f, "Cooling"),
            SchedulerState::Error => write!(f, "Error"),
            SchedulerState::Shutdown => write!(f, "Shutdown"),
        }
    }
}
