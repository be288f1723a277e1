//! Run lifecycle state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle state of one supervised tool run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// Created, process not yet started.
    #[default]
    Pending,
    /// Process started, output being read.
    Running,
    /// Cancellation observed before stream end; process killed.
    Cancelled,
    /// Stream ended normally and the process exited.
    Completed,
    /// Process start or stream I/O failed.
    Failed,
}

impl RunState {
    /// Whether the run has reached a terminal state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed | Self::Failed)
    }
}

/// Tracks the state of a run and logs transitions.
#[derive(Debug, Clone, Default)]
pub struct RunStateMachine {
    state: RunState,
}

impl RunStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn transition(&mut self, new_state: RunState) {
        tracing::debug!(from = ?self.state, to = ?new_state, "run state transition");
        self.state = new_state;
    }
}
