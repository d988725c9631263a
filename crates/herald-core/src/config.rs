//! Task and command configuration.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::ids::{CommandId, InstanceId, NotifierId, TaskId};
use crate::notification::RunBy;
use crate::runtime::TaskRuntime;
use crate::snapshot::SnapshotFactory;
use crate::store::ResultStore;

/// Builds a runtime for one execution request.
pub type TaskFactory = Arc<dyn Fn(NewTaskParams) -> Result<TaskRuntime> + Send + Sync>;

/// A request to run one command of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    pub task_id: TaskId,
    pub command_id: CommandId,
    pub notifier_id: NotifierId,
    pub run_by: RunBy,
}

impl TaskRequest {
    /// Creates a new request.
    pub fn new(
        task_id: impl Into<TaskId>,
        command_id: impl Into<CommandId>,
        notifier_id: impl Into<NotifierId>,
        run_by: RunBy,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            command_id: command_id.into(),
            notifier_id: notifier_id.into(),
            run_by,
        }
    }
}

/// Everything a [`TaskFactory`] gets to build a runtime.
#[derive(Clone)]
pub struct NewTaskParams {
    pub instance_id: InstanceId,
    pub request: TaskRequest,
    pub resolved: ResolvedConfig,
    pub store: Option<Arc<dyn ResultStore>>,
}

impl fmt::Debug for NewTaskParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewTaskParams")
            .field("instance_id", &self.instance_id)
            .field("request", &self.request)
            .field("resolved", &self.resolved)
            .field("store", &self.store.is_some())
            .finish()
    }
}

/// One command a task supports.
#[derive(Clone)]
pub struct CommandConfig {
    /// Command ID. May be a wildcard pattern (`*`, `?`).
    pub id: CommandId,
    pub description: String,
    /// Whether several instances of this command may run at once.
    pub allow_multiple: bool,
    /// Factory for an empty result snapshot. Required at registration.
    pub new_snapshot: Option<SnapshotFactory>,
}

impl CommandConfig {
    /// Creates a command with a snapshot factory.
    pub fn new(id: impl Into<CommandId>, new_snapshot: SnapshotFactory) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            allow_multiple: false,
            new_snapshot: Some(new_snapshot),
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets whether concurrent instances are allowed.
    pub fn with_allow_multiple(mut self, allow: bool) -> Self {
        self.allow_multiple = allow;
        self
    }
}

impl fmt::Debug for CommandConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandConfig")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("allow_multiple", &self.allow_multiple)
            .field("new_snapshot", &self.new_snapshot.is_some())
            .finish()
    }
}

/// A task and the commands it supports.
#[derive(Clone)]
pub struct TaskConfig {
    pub commands: Vec<CommandConfig>,
    pub new_task: TaskFactory,
}

impl TaskConfig {
    /// Creates a task config with no commands yet.
    pub fn new(new_task: TaskFactory) -> Self {
        Self {
            commands: Vec::new(),
            new_task,
        }
    }

    /// Adds a command.
    pub fn with_command(mut self, command: CommandConfig) -> Self {
        self.commands.push(command);
        self
    }

    /// Returns the IDs of all commands, in registration order.
    pub fn command_ids(&self) -> Vec<CommandId> {
        self.commands.iter().map(|c| c.id.clone()).collect()
    }
}

impl fmt::Debug for TaskConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskConfig")
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

/// A task config copied out of the registry, with the matched command.
///
/// The command list is read-only so the matched index always stays valid.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    task: TaskConfig,
    command_index: usize,
}

impl ResolvedConfig {
    pub(crate) fn new(task: TaskConfig, command_index: usize) -> Self {
        Self {
            task,
            command_index,
        }
    }

    /// The task config this copy was made from.
    pub fn task(&self) -> &TaskConfig {
        &self.task
    }

    /// The matched command inside [`ResolvedConfig::task`].
    pub fn command(&self) -> &CommandConfig {
        &self.task.commands[self.command_index]
    }

    /// Mutable access to the matched command. Only affects this copy.
    pub fn command_mut(&mut self) -> &mut CommandConfig {
        &mut self.task.commands[self.command_index]
    }

    /// Builds a runtime through the task's factory.
    pub fn new_task(&self, params: NewTaskParams) -> Result<TaskRuntime> {
        (self.task.new_task)(params)
    }
}
