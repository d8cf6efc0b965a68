//! EngineState value object
//! Lifecycle of the single supervised engine process

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EngineState {
    /// No process handle is held
    #[default]
    Stopped,

    /// Hooks and spawn in progress
    Starting,

    /// Process handle held, child alive
    Running,

    /// Termination requested, waiting for the exit task
    Stopping,
}

impl EngineState {
    /// Validate state transition
    pub fn can_transition_to(&self, next: EngineState) -> bool {
        use EngineState::*;

        matches!(
            (self, next),
            (Stopped, Starting)
                | (Starting, Running)
                // spawn failed
                | (Starting, Stopped)
                | (Running, Stopping)
                // child exited on its own
                | (Running, Stopped)
                | (Stopping, Stopped)
        )
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Stopped => write!(f, "stopped"),
            EngineState::Starting => write!(f, "starting"),
            EngineState::Running => write!(f, "running"),
            EngineState::Stopping => write!(f, "stopping"),
        }
    }
}
