//! Notifier that writes to the log.

use async_trait::async_trait;
use herald_core::{Notification, Notifier, NotifierId, NotifyError, TaskContext};
use tracing::{info, warn};

/// Logs every notification. Used for dry runs and when Telegram is not
/// configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, _ctx: &TaskContext, notification: Notification) -> Result<(), NotifyError> {
        if notification.error_occurred {
            warn!(
                task_id = %notification.task_id,
                command_id = %notification.command_id,
                instance_id = %notification.instance_id,
                detail = %notification.detail,
                "{}",
                notification.message
            );
        } else {
            info!(
                task_id = %notification.task_id,
                command_id = %notification.command_id,
                instance_id = %notification.instance_id,
                cancelable = notification.cancelable,
                elapsed_ms = notification.elapsed.as_millis() as u64,
                "{}",
                notification.message
            );
        }
        Ok(())
    }

    fn supports_rich_formatting(&self, _notifier_id: &NotifierId) -> bool {
        false
    }
}
