//! Lifecycle states

use serde::{Deserialize, Serialize};

/// Where a worker instance is in its install/activate sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Installing,
    Waiting,
    Activating,
    Activated,
}

impl LifecycleState {
    /// States a transition to `self` may start from.
    pub fn predecessors(self) -> &'static [LifecycleState] {
        match self {
            LifecycleState::Installing => &[],
            LifecycleState::Waiting => &[LifecycleState::Installing],
            // A failed activation leaves the instance in Activating; retrying is allowed.
            LifecycleState::Activating => &[LifecycleState::Waiting, LifecycleState::Activating],
            LifecycleState::Activated => &[LifecycleState::Activating],
        }
    }

    pub fn can_move_to(self, next: LifecycleState) -> bool {
        next.predecessors().contains(&self)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Installing => "installing",
            LifecycleState::Waiting => "waiting",
            LifecycleState::Activating => "activating",
            LifecycleState::Activated => "activated",
        };
        f.write_str(name)
    }
}
