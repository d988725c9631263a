//! Service events.

use herald_core::{CommandId, InstanceId, RunBy, TaskId, TaskState};

/// Events broadcast by the [`TaskService`](crate::TaskService).
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceEvent {
    /// An instance was spawned.
    Started {
        instance_id: InstanceId,
        task_id: TaskId,
        command_id: CommandId,
        run_by: RunBy,
    },
    /// Cancellation was requested for an instance.
    CancelRequested { instance_id: InstanceId },
    /// An instance left the service.
    Finished {
        instance_id: InstanceId,
        state: TaskState,
    },
}

impl ServiceEvent {
    /// Returns the instance this event is about.
    pub fn instance_id(&self) -> &InstanceId {
        match self {
            ServiceEvent::Started { instance_id, .. } => instance_id,
            ServiceEvent::CancelRequested { instance_id } => instance_id,
            ServiceEvent::Finished { instance_id, .. } => instance_id,
        }
    }

    /// Returns the final state if this is a `Finished` event.
    pub fn finished_state(&self) -> Option<TaskState> {
        match self {
            ServiceEvent::Finished { state, .. } => Some(*state),
            _ => None,
        }
    }
}
