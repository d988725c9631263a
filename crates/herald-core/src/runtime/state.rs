//! Lifecycle states of a task runtime.

use serde::{Deserialize, Serialize};

/// Where a [`TaskRuntime`](super::TaskRuntime) is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    Created,
    Preparing,
    Executing,
    Finalizing,
    Succeeded,
    Failed,
    Canceled,
}

impl TaskState {
    /// Returns true for `Succeeded`, `Failed` and `Canceled`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::Canceled
        )
    }

    /// Lifecycle states only move forward; terminal states are final.
    pub fn can_transition_to(self, next: TaskState) -> bool {
        use TaskState::*;
        match (self, next) {
            (Created, Preparing) => true,
            (Preparing, Executing) => true,
            (Executing, Finalizing) => true,
            (Finalizing, Succeeded) => true,
            (from, Failed | Canceled) => !from.is_terminal(),
            _ => false,
        }
    }
}
