//! Task service for spawning and tracking task runs.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use herald_core::{
    CommandId, InstanceId, NewTaskParams, Notifier, Registry, ResultStore, RunBy, TaskContext,
    TaskError, TaskId, TaskRequest, TaskRuntime, TaskState,
};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::error::{Result, ServiceError};
use crate::event::ServiceEvent;
use crate::settings::ServiceSettings;

/// Configuration for the task service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Maximum concurrently running instances.
    pub max_instances: usize,
    /// Deadline applied to every run.
    pub default_timeout: Option<Duration>,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_instances: 10,
            default_timeout: None,
            event_capacity: 256,
        }
    }
}

impl ServiceConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of instances.
    pub fn with_max_instances(mut self, max: usize) -> Self {
        self.max_instances = max;
        self
    }

    /// Sets the deadline applied to every run.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }
}

impl From<&ServiceSettings> for ServiceConfig {
    fn from(settings: &ServiceSettings) -> Self {
        Self {
            max_instances: settings.max_instances,
            default_timeout: settings.default_timeout(),
            ..Self::default()
        }
    }
}

/// A run currently owned by the service.
pub struct RunningTask {
    pub runtime: Arc<TaskRuntime>,
    pub started_at: DateTime<Utc>,
}

impl fmt::Debug for RunningTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunningTask")
            .field("instance_id", self.runtime.instance_id())
            .field("task_id", self.runtime.task_id())
            .field("command_id", self.runtime.command_id())
            .field("state", &self.runtime.state())
            .field("started_at", &self.started_at)
            .finish()
    }
}

/// Snapshot of a running instance for listing.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceInfo {
    pub instance_id: InstanceId,
    pub task_id: TaskId,
    pub command_id: CommandId,
    pub run_by: RunBy,
    pub state: TaskState,
    pub started_at: DateTime<Utc>,
}

/// Spawns task runs, tracks them and cancels them on request.
///
/// Every run gets its own tokio task. The service enforces the instance
/// limit and the per-command `allow_multiple` flag, and broadcasts a
/// [`ServiceEvent`] when a run starts, is asked to cancel and finishes.
pub struct TaskService {
    config: ServiceConfig,
    registry: Arc<Registry>,
    store: Arc<dyn ResultStore>,
    notifier: Arc<dyn Notifier>,
    /// Running instances keyed by instance ID.
    instances: Arc<RwLock<HashMap<InstanceId, RunningTask>>>,
    event_tx: broadcast::Sender<ServiceEvent>,
    /// Parent of every run's context; canceled on shutdown.
    root: TaskContext,
    tracker: TaskTracker,
}

impl fmt::Debug for TaskService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskService")
            .field("config", &self.config)
            .field("tasks", &self.registry.len())
            .field("shutting_down", &self.root.is_canceled())
            .finish()
    }
}

impl TaskService {
    /// Creates a new task service.
    pub fn new(
        config: ServiceConfig,
        registry: Arc<Registry>,
        store: Arc<dyn ResultStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity);
        Self {
            config,
            registry,
            store,
            notifier,
            instances: Arc::new(RwLock::new(HashMap::new())),
            event_tx,
            root: TaskContext::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Returns the task registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Subscribe to service events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServiceEvent> {
        self.event_tx.subscribe()
    }

    /// Starts a run and returns its instance ID without waiting for it.
    pub async fn submit(&self, request: TaskRequest) -> Result<InstanceId> {
        let (instance_id, _handle) = self.spawn(request).await?;
        Ok(instance_id)
    }

    /// Starts a run and waits until it leaves the service.
    pub async fn run_to_completion(&self, request: TaskRequest) -> Result<TaskState> {
        let (instance_id, handle) = self.spawn(request).await?;
        handle.await.map_err(|e| {
            ServiceError::Task(TaskError::Internal(format!(
                "run {} did not complete: {}",
                instance_id, e
            )))
        })
    }

    async fn spawn(&self, request: TaskRequest) -> Result<(InstanceId, JoinHandle<TaskState>)> {
        if self.root.is_canceled() {
            return Err(ServiceError::ShuttingDown);
        }

        let resolved = self
            .registry
            .find_config(&request.task_id, &request.command_id)?;
        let allow_multiple = resolved.command().allow_multiple;

        // Held until the run is registered so the limit checks stay exact.
        let mut instances = self.instances.write().await;

        if instances.len() >= self.config.max_instances {
            return Err(ServiceError::MaxInstancesReached(self.config.max_instances));
        }

        if !allow_multiple {
            let busy = instances.values().find(|t| {
                t.runtime.task_id() == &request.task_id
                    && t.runtime.command_id() == &request.command_id
            });
            if let Some(busy) = busy {
                return Err(ServiceError::AlreadyRunning {
                    task_id: request.task_id.clone(),
                    command_id: request.command_id.clone(),
                    instance_id: busy.runtime.instance_id().clone(),
                });
            }
        }

        let runtime = Arc::new(resolved.new_task(NewTaskParams {
            instance_id: InstanceId::new(),
            request: request.clone(),
            resolved: resolved.clone(),
            store: Some(Arc::clone(&self.store)),
        })?);
        let instance_id = runtime.instance_id().clone();

        let ctx = match self.config.default_timeout {
            Some(timeout) => self.root.with_timeout(timeout),
            None => self.root.clone(),
        };

        debug!(
            instance_id = %instance_id,
            task_id = %request.task_id,
            command_id = %request.command_id,
            run_by = ?request.run_by,
            "spawning task run"
        );

        let handle = self.tracker.spawn(run_instance(
            Arc::clone(&runtime),
            ctx,
            Arc::clone(&self.notifier),
            Arc::clone(&self.instances),
            self.event_tx.clone(),
        ));

        instances.insert(
            instance_id.clone(),
            RunningTask {
                runtime,
                started_at: Utc::now(),
            },
        );

        self.emit_event(ServiceEvent::Started {
            instance_id: instance_id.clone(),
            task_id: request.task_id.clone(),
            command_id: request.command_id.clone(),
            run_by: request.run_by,
        });
        drop(instances);

        info!(
            instance_id = %instance_id,
            task_id = %request.task_id,
            command_id = %request.command_id,
            "task run started"
        );

        Ok((instance_id, handle))
    }

    /// Requests cancellation of a running instance.
    pub async fn cancel(&self, instance_id: &InstanceId) -> Result<()> {
        let runtime = {
            let instances = self.instances.read().await;
            instances
                .get(instance_id)
                .map(|t| Arc::clone(&t.runtime))
                .ok_or_else(|| ServiceError::InstanceNotFound(instance_id.clone()))?
        };

        runtime.cancel();
        self.emit_event(ServiceEvent::CancelRequested {
            instance_id: instance_id.clone(),
        });
        Ok(())
    }

    /// Lists running instances, oldest first.
    pub async fn running(&self) -> Vec<InstanceInfo> {
        let instances = self.instances.read().await;
        let mut infos: Vec<InstanceInfo> = instances
            .values()
            .map(|t| InstanceInfo {
                instance_id: t.runtime.instance_id().clone(),
                task_id: t.runtime.task_id().clone(),
                command_id: t.runtime.command_id().clone(),
                run_by: t.runtime.run_by(),
                state: t.runtime.state(),
                started_at: t.started_at,
            })
            .collect();
        infos.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        infos
    }

    /// Cancels every run, refuses new ones and waits for all to finish.
    pub async fn shutdown(&self) {
        info!("shutting down task service");
        self.root.token().cancel();

        {
            let instances = self.instances.read().await;
            for task in instances.values() {
                task.runtime.cancel();
            }
        }

        self.tracker.close();
        self.tracker.wait().await;

        info!("task service stopped");
    }

    /// Emit an event to all subscribers.
    fn emit_event(&self, event: ServiceEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }
}

async fn run_instance(
    runtime: Arc<TaskRuntime>,
    ctx: TaskContext,
    notifier: Arc<dyn Notifier>,
    instances: Arc<RwLock<HashMap<InstanceId, RunningTask>>>,
    event_tx: broadcast::Sender<ServiceEvent>,
) -> TaskState {
    runtime.run(&ctx, notifier.as_ref()).await;

    let state = runtime.state();
    let instance_id = runtime.instance_id().clone();
    if instances.write().await.remove(&instance_id).is_none() {
        warn!(instance_id = %instance_id, "finished run was not tracked");
    }

    debug!(
        instance_id = %instance_id,
        state = ?state,
        elapsed_ms = runtime.elapsed().as_millis() as u64,
        "task run finished"
    );
    let _ = event_tx.send(ServiceEvent::Finished { instance_id, state });
    state
}
