//! Error types for the core crate.

use thiserror::Error;

use crate::store::StoreError;

/// Broad classification of a [`TaskError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Conflict,
    Internal,
    System,
    ExecutionFailed,
    Forbidden,
    Canceled,
    DeadlineExceeded,
}

/// Errors raised by the registry, the runtime and task business logic.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Malformed identifier or missing required setting.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unknown task or command.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate registration or a run that may not start concurrently.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A violated invariant, including a caught panic.
    #[error("internal error: {0}")]
    Internal(String),

    /// Process, filesystem or environment failure.
    #[error("system error: {0}")]
    System(String),

    /// Task business logic failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Task business logic refused the request.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The run was explicitly canceled.
    #[error("task canceled")]
    Canceled,

    /// A deadline attached to the task context expired.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Result store failure.
    #[error("result store error: {0}")]
    Store(#[from] StoreError),
}

impl TaskError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TaskError::InvalidInput(_) => ErrorKind::InvalidInput,
            TaskError::NotFound(_) => ErrorKind::NotFound,
            TaskError::Conflict(_) => ErrorKind::Conflict,
            TaskError::Internal(_) => ErrorKind::Internal,
            TaskError::System(_) => ErrorKind::System,
            TaskError::ExecutionFailed(_) => ErrorKind::ExecutionFailed,
            TaskError::Forbidden(_) => ErrorKind::Forbidden,
            TaskError::Canceled => ErrorKind::Canceled,
            TaskError::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            TaskError::Store(StoreError::NotFound { .. }) => ErrorKind::NotFound,
            TaskError::Store(_) => ErrorKind::System,
        }
    }

    /// Returns true for explicit cooperative cancellation only.
    ///
    /// An expired deadline is a failure, not a cancellation.
    pub fn is_canceled(&self) -> bool {
        matches!(self, TaskError::Canceled)
    }
}

impl From<std::io::Error> for TaskError {
    fn from(e: std::io::Error) -> Self {
        TaskError::System(e.to_string())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, TaskError>;
