//! Outbound notifications and the notifier contract.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::TaskContext;
use crate::ids::{CommandId, InstanceId, NotifierId, TaskId};

/// Who asked for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunBy {
    /// Periodic run started by the scheduler.
    #[default]
    Scheduler,
    /// Interactive run requested by a user.
    User,
}

/// A message produced by a task run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub notifier_id: NotifierId,
    pub task_id: TaskId,
    pub command_id: CommandId,
    pub instance_id: InstanceId,
    pub message: String,
    /// Plain text the runtime appends to `message`, such as a save warning.
    pub detail: String,
    /// `message` is task output written under the rich-formatting flag and
    /// is delivered verbatim; otherwise it is plain text.
    pub formatted: bool,
    /// Time since the run started.
    pub elapsed: Duration,
    pub error_occurred: bool,
    /// The recipient may still cancel the work this message describes.
    pub cancelable: bool,
}

/// Errors raised while delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// No channel is configured for the notifier ID.
    #[error("unknown notifier: {0}")]
    UnknownNotifier(String),

    /// The transport rejected or failed to deliver the message.
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// A channel that delivers notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers a notification.
    async fn notify(&self, ctx: &TaskContext, notification: Notification)
        -> Result<(), NotifyError>;

    /// Whether messages for `notifier_id` may use rich formatting (HTML).
    fn supports_rich_formatting(&self, notifier_id: &NotifierId) -> bool;
}
