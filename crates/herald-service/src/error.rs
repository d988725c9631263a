//! Error types for the service crate.

use herald_core::{CommandId, InstanceId, TaskError, TaskId};
use herald_telegram::TelegramError;
use thiserror::Error;

/// Errors that can occur in the task service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Invalid or unreadable settings.
    #[error("configuration error: {0}")]
    Config(String),

    /// Registry or runtime error.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// Instance not found.
    #[error("instance not found: {0}")]
    InstanceNotFound(InstanceId),

    /// The command is already running and does not allow a second instance.
    #[error("{task_id}/{command_id} is already running as {instance_id}")]
    AlreadyRunning {
        task_id: TaskId,
        command_id: CommandId,
        instance_id: InstanceId,
    },

    /// Maximum instances reached.
    #[error("maximum instances reached: {0}")]
    MaxInstancesReached(usize),

    /// The service is shutting down and accepts no new runs.
    #[error("service is shutting down")]
    ShuttingDown,

    /// Telegram setup error.
    #[error(transparent)]
    Telegram(#[from] TelegramError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

impl From<ServiceError> for TaskError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Task(e) => e,
            ServiceError::InstanceNotFound(_) => TaskError::NotFound(e.to_string()),
            ServiceError::AlreadyRunning { .. } | ServiceError::MaxInstancesReached(_) => {
                TaskError::Conflict(e.to_string())
            }
            ServiceError::Config(msg) => TaskError::InvalidInput(msg),
            other => TaskError::System(other.to_string()),
        }
    }
}
