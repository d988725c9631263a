//! Values returned by task business logic.

use crate::error::TaskError;
use crate::snapshot::Snapshot;

/// Successful result of business logic.
#[derive(Debug, Default)]
pub struct ExecuteOutput {
    /// Text to notify. Empty means "nothing to report".
    pub message: String,
    /// New snapshot to persist, if the state changed.
    pub snapshot: Option<Box<dyn Snapshot>>,
}

impl ExecuteOutput {
    /// An output with a message and no snapshot.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            snapshot: None,
        }
    }

    /// An output that notifies nobody and saves nothing.
    pub fn silent() -> Self {
        Self::default()
    }

    /// Attaches a snapshot to save.
    pub fn with_snapshot<S: Snapshot>(mut self, snapshot: S) -> Self {
        self.snapshot = Some(Box::new(snapshot));
        self
    }
}

/// Failed result of business logic, with any output produced before failing.
#[derive(Debug)]
pub struct ExecuteFailure {
    pub error: TaskError,
    pub partial_message: String,
}

impl ExecuteFailure {
    /// Attaches partial output to an error.
    pub fn with_partial(error: TaskError, partial_message: impl Into<String>) -> Self {
        Self {
            error,
            partial_message: partial_message.into(),
        }
    }
}

impl From<TaskError> for ExecuteFailure {
    fn from(error: TaskError) -> Self {
        Self {
            error,
            partial_message: String::new(),
        }
    }
}
