//! Bridges chat commands to the task service.

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::{CommandId, InstanceId, NotifierId, RunBy, TaskError, TaskId, TaskRequest};
use herald_telegram::CommandHandler;

use crate::service::TaskService;

/// Runs chat requests as user-initiated runs reported to one notifier.
#[derive(Debug, Clone)]
pub struct ServiceCommands {
    service: Arc<TaskService>,
    notifier_id: NotifierId,
}

impl ServiceCommands {
    pub fn new(service: Arc<TaskService>, notifier_id: impl Into<NotifierId>) -> Self {
        Self {
            service,
            notifier_id: notifier_id.into(),
        }
    }
}

#[async_trait]
impl CommandHandler for ServiceCommands {
    async fn run(&self, task_id: TaskId, command_id: CommandId) -> Result<InstanceId, TaskError> {
        let request = TaskRequest::new(task_id, command_id, self.notifier_id.clone(), RunBy::User);
        Ok(self.service.submit(request).await?)
    }

    async fn cancel(&self, instance_id: &InstanceId) -> Result<(), TaskError> {
        Ok(self.service.cancel(instance_id).await?)
    }

    fn describe_tasks(&self) -> Vec<String> {
        describe_tasks(&self.service)
    }
}

/// One line per registered task: `task: Cmd1, Cmd2`.
pub fn describe_tasks(service: &TaskService) -> Vec<String> {
    let registry = service.registry();
    registry
        .task_ids()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|task_id| {
            let config = registry.task_config(&task_id).ok().flatten()?;
            let commands: Vec<String> = config
                .commands
                .iter()
                .map(|c| {
                    if c.description.is_empty() {
                        c.id.to_string()
                    } else {
                        format!("{} ({})", c.id, c.description)
                    }
                })
                .collect();
            Some(format!("{}: {}", task_id, commands.join(", ")))
        })
        .collect()
}
