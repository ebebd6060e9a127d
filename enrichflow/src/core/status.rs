//! Run identifiers and the run status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequence number of one enrichment run.
///
/// Issued by the coordinator in strictly increasing order, so a larger id is
/// always a newer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(u64);

impl RunId {
    /// Wraps a raw sequence number.
    #[must_use]
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// Returns the raw sequence number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// The lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created and handed to the runtime, not yet picked up.
    #[default]
    Scheduled,
    /// The worker is iterating results.
    Running,
    /// Every result was processed.
    Completed,
    /// Stopped through `stop_enrichment`.
    Cancelled,
    /// Replaced by a newer run.
    Superseded,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduled => write!(f, "scheduled"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Superseded => write!(f, "superseded"),
        }
    }
}

impl RunStatus {
    /// Returns true if the status is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Superseded)
    }

    /// Returns true while the run is scheduled or executing.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true for both plain cancellation and supersession.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Superseded)
    }

    /// Returns true if moving from `self` to `next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        match self {
            Self::Scheduled => matches!(
                next,
                Self::Running | Self::Cancelled | Self::Superseded
            ),
            Self::Running => next.is_terminal(),
            Self::Completed | Self::Cancelled | Self::Superseded => false,
        }
    }
}
