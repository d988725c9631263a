//! Task execution runtime.
//!
//! A [`TaskRuntime`] is one execution instance of a task command. It loads
//! the previous snapshot, runs the bound business logic, saves the new
//! snapshot and reports the outcome through a [`Notifier`].
//!
//! The lifecycle is strictly sequential:
//!
//! ```text
//! Created -> Preparing -> Executing -> Finalizing -> Succeeded | Failed | Canceled
//! ```
//!
//! Cancellation is checked before anything starts, after preparation and
//! after execution. A canceled run never notifies.

mod outcome;
mod state;

#[cfg(test)]
mod tests;

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{NewTaskParams, TaskRequest};
use crate::context::TaskContext;
use crate::error::TaskError;
use crate::ids::{CommandId, InstanceId, NotifierId, TaskId};
use crate::notification::{Notification, Notifier, RunBy};
use crate::snapshot::{Snapshot, SnapshotFactory};
use crate::store::{LoadOutcome, ResultStore};

pub use outcome::{ExecuteFailure, ExecuteOutput};
pub use state::TaskState;

/// Business logic bound to a runtime.
///
/// Receives the cancellation scope, the previous snapshot (`None` when the
/// command has no snapshot support) and whether the notifier accepts rich
/// formatting.
pub type ExecuteFn = Arc<
    dyn Fn(
            TaskContext,
            Option<Box<dyn Snapshot>>,
            bool,
        ) -> BoxFuture<'static, Result<ExecuteOutput, ExecuteFailure>>
        + Send
        + Sync,
>;

/// Wraps an async closure into an [`ExecuteFn`].
pub fn execute_fn<F, Fut>(f: F) -> ExecuteFn
where
    F: Fn(TaskContext, Option<Box<dyn Snapshot>>, bool) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ExecuteOutput, ExecuteFailure>> + Send + 'static,
{
    Arc::new(move |ctx, snapshot, rich| Box::pin(f(ctx, snapshot, rich)))
}

/// Preamble of every failure notification.
pub const FAILURE_PREAMBLE: &str = "The task failed to complete.";

/// Appended to a success message whose snapshot could not be saved.
pub const SAVE_FAILURE_WARNING: &str =
    "Warning: the result could not be saved, so the next run may repeat this notification.";

/// One execution instance of a task command.
pub struct TaskRuntime {
    task_id: TaskId,
    command_id: CommandId,
    instance_id: InstanceId,
    notifier_id: NotifierId,
    run_by: RunBy,

    execute: Option<ExecuteFn>,
    store: Option<Arc<dyn ResultStore>>,
    new_snapshot: Option<SnapshotFactory>,

    canceled: AtomicBool,
    started: AtomicBool,
    cancel_handle: Mutex<Option<CancellationToken>>,
    started_at: RwLock<Option<Instant>>,
    state: Mutex<TaskState>,
}

impl fmt::Debug for TaskRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRuntime")
            .field("task_id", &self.task_id)
            .field("command_id", &self.command_id)
            .field("instance_id", &self.instance_id)
            .field("notifier_id", &self.notifier_id)
            .field("run_by", &self.run_by)
            .field("execute", &self.execute.is_some())
            .field("store", &self.store.is_some())
            .field("new_snapshot", &self.new_snapshot.is_some())
            .field("canceled", &self.is_canceled())
            .field("state", &self.state())
            .finish()
    }
}

impl TaskRuntime {
    /// Creates a runtime for a request. Nothing is bound yet.
    pub fn new(instance_id: InstanceId, request: &TaskRequest) -> Self {
        Self {
            task_id: request.task_id.clone(),
            command_id: request.command_id.clone(),
            instance_id,
            notifier_id: request.notifier_id.clone(),
            run_by: request.run_by,
            execute: None,
            store: None,
            new_snapshot: None,
            canceled: AtomicBool::new(false),
            started: AtomicBool::new(false),
            cancel_handle: Mutex::new(None),
            started_at: RwLock::new(None),
            state: Mutex::new(TaskState::Created),
        }
    }

    /// Creates a runtime from factory parameters, taking the result store
    /// and the matched command's snapshot factory.
    pub fn from_params(params: &NewTaskParams) -> Self {
        let mut runtime = Self::new(params.instance_id.clone(), &params.request);
        runtime.store = params.store.clone();
        runtime.new_snapshot = params.resolved.command().new_snapshot.clone();
        runtime
    }

    /// Binds the business logic.
    pub fn with_execute(mut self, execute: ExecuteFn) -> Self {
        self.execute = Some(execute);
        self
    }

    /// Sets the result store.
    pub fn with_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the snapshot factory.
    pub fn with_snapshot_factory(mut self, factory: SnapshotFactory) -> Self {
        self.new_snapshot = Some(factory);
        self
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn command_id(&self) -> &CommandId {
        &self.command_id
    }

    pub fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    pub fn notifier_id(&self) -> &NotifierId {
        &self.notifier_id
    }

    pub fn run_by(&self) -> RunBy {
        self.run_by
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> TaskState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Requests cancellation. Idempotent and callable from any thread.
    ///
    /// Also interrupts business logic currently awaiting on its context.
    pub fn cancel(&self) {
        let already = self.canceled.swap(true, Ordering::SeqCst);

        let handle = self
            .cancel_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = handle.as_ref() {
            token.cancel();
        }

        if !already {
            info!(
                task_id = %self.task_id,
                command_id = %self.command_id,
                instance_id = %self.instance_id,
                "task cancel requested"
            );
        }
    }

    /// Returns true once [`TaskRuntime::cancel`] was called.
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    /// Time since execution started; zero before that.
    pub fn elapsed(&self) -> Duration {
        let started_at = *self
            .started_at
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        started_at
            .map(|start| start.elapsed())
            .unwrap_or_default()
    }

    /// Runs the task lifecycle.
    ///
    /// Never panics and never returns an error: every failure is reported
    /// through `notifier`. A runtime runs at most once; later calls are
    /// ignored.
    pub async fn run(&self, ctx: &TaskContext, notifier: &dyn Notifier) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!(
                task_id = %self.task_id,
                instance_id = %self.instance_id,
                "task runtime already ran; ignoring"
            );
            return;
        }

        if self.is_canceled() {
            info!(
                task_id = %self.task_id,
                command_id = %self.command_id,
                instance_id = %self.instance_id,
                "task canceled before start"
            );
            self.set_state(TaskState::Canceled);
            return;
        }

        let (scope, token) = ctx.child();
        let _handle = self.install_cancel_handle(token);

        let lifecycle = AssertUnwindSafe(self.lifecycle(ctx, &scope, notifier))
            .catch_unwind()
            .await;

        if let Err(panic) = lifecycle {
            let detail = panic_message(&*panic);
            error!(
                task_id = %self.task_id,
                command_id = %self.command_id,
                instance_id = %self.instance_id,
                panic = %detail,
                "task panicked"
            );
            self.set_state(TaskState::Failed);

            let err = TaskError::Internal(format!("task panicked: {}", detail));
            let report = AssertUnwindSafe(self.notify_failure(ctx, notifier, &err, ""))
                .catch_unwind()
                .await;
            if report.is_err() {
                error!(
                    task_id = %self.task_id,
                    instance_id = %self.instance_id,
                    "panic while reporting a task panic; giving up"
                );
            }
        }
    }

    async fn lifecycle(&self, ctx: &TaskContext, scope: &TaskContext, notifier: &dyn Notifier) {
        self.mark_started();
        self.set_state(TaskState::Preparing);

        let (execute, snapshot) = match self.prepare(ctx, notifier).await {
            Ok(prepared) => prepared,
            Err(err) => {
                self.set_state(TaskState::Failed);
                self.notify_failure(ctx, notifier, &err, "").await;
                return;
            }
        };

        if self.is_canceled() {
            info!(
                task_id = %self.task_id,
                instance_id = %self.instance_id,
                "task canceled during preparation"
            );
            self.set_state(TaskState::Canceled);
            return;
        }

        self.set_state(TaskState::Executing);
        let rich = notifier.supports_rich_formatting(&self.notifier_id);
        debug!(
            task_id = %self.task_id,
            command_id = %self.command_id,
            instance_id = %self.instance_id,
            rich_formatting = rich,
            "executing task"
        );
        let result = execute(scope.clone(), snapshot, rich).await;

        if self.is_canceled() {
            info!(
                task_id = %self.task_id,
                instance_id = %self.instance_id,
                "task canceled during execution; discarding result"
            );
            self.set_state(TaskState::Canceled);
            return;
        }

        self.set_state(TaskState::Finalizing);
        self.finish(ctx, notifier, result).await;
    }

    /// Checks preconditions and loads the previous snapshot.
    async fn prepare(
        &self,
        ctx: &TaskContext,
        notifier: &dyn Notifier,
    ) -> Result<(ExecuteFn, Option<Box<dyn Snapshot>>), TaskError> {
        let execute = self.execute.clone().ok_or_else(|| {
            TaskError::Internal("business logic not initialized".to_string())
        })?;

        let Some(factory) = self.new_snapshot.as_ref() else {
            return Ok((execute, None));
        };

        let mut snapshot = factory().ok_or_else(|| {
            TaskError::Internal("snapshot factory returned nothing".to_string())
        })?;

        let store = self.store.as_ref().ok_or_else(|| {
            TaskError::Internal("snapshot factory set without a result store".to_string())
        })?;

        match store
            .load(&self.task_id, &self.command_id, &mut *snapshot)
            .await
        {
            Ok(LoadOutcome::Fresh) => {
                debug!(
                    task_id = %self.task_id,
                    command_id = %self.command_id,
                    "previous snapshot loaded"
                );
            }
            Ok(LoadOutcome::Stale { reason }) => {
                warn!(
                    task_id = %self.task_id,
                    command_id = %self.command_id,
                    reason = %reason,
                    "previous snapshot is stale"
                );
                if self.run_by == RunBy::User {
                    let message = format!(
                        "The previous result may be outdated ({}). Continuing anyway.",
                        reason
                    );
                    self.send(ctx, notifier, message, false, true).await;
                }
            }
            Err(e) if e.is_not_found() => {
                info!(
                    task_id = %self.task_id,
                    command_id = %self.command_id,
                    "no previous snapshot; first run"
                );
            }
            Err(e) => {
                error!(
                    task_id = %self.task_id,
                    command_id = %self.command_id,
                    error = %e,
                    "failed to load previous snapshot"
                );
                return Err(TaskError::Store(e));
            }
        }

        Ok((execute, Some(snapshot)))
    }

    /// Saves the new snapshot and reports the outcome.
    async fn finish(
        &self,
        ctx: &TaskContext,
        notifier: &dyn Notifier,
        result: Result<ExecuteOutput, ExecuteFailure>,
    ) {
        let output = match result {
            Ok(output) => output,
            Err(failure) if failure.error.is_canceled() => {
                info!(
                    task_id = %self.task_id,
                    instance_id = %self.instance_id,
                    "task reported cancellation"
                );
                self.set_state(TaskState::Canceled);
                return;
            }
            Err(failure) => {
                self.set_state(TaskState::Failed);
                self.notify_failure(ctx, notifier, &failure.error, &failure.partial_message)
                    .await;
                return;
            }
        };

        if let Some(snapshot) = output.snapshot.as_deref() {
            match self.store.as_ref() {
                Some(store) => {
                    if let Err(e) = store.save(&self.task_id, &self.command_id, snapshot).await {
                        error!(
                            task_id = %self.task_id,
                            command_id = %self.command_id,
                            error = %e,
                            "failed to save snapshot"
                        );
                        self.set_state(TaskState::Failed);

                        if output.message.is_empty() {
                            let err = TaskError::Store(e);
                            self.notify_failure(ctx, notifier, &err, "").await;
                        } else {
                            let mut notification = self.notification(output.message, true, false);
                            notification.formatted = true;
                            notification.detail = format!("{}\n({})", SAVE_FAILURE_WARNING, e);
                            self.deliver(ctx, notifier, notification).await;
                        }
                        return;
                    }
                }
                None => {
                    debug!(
                        task_id = %self.task_id,
                        "no result store; new snapshot discarded"
                    );
                }
            }
        }

        self.set_state(TaskState::Succeeded);

        if output.message.is_empty() {
            debug!(
                task_id = %self.task_id,
                instance_id = %self.instance_id,
                "task finished with nothing to report"
            );
            return;
        }

        let mut notification = self.notification(output.message, false, false);
        notification.formatted = true;
        self.deliver(ctx, notifier, notification).await;
    }

    async fn notify_failure(
        &self,
        ctx: &TaskContext,
        notifier: &dyn Notifier,
        err: &TaskError,
        partial_message: &str,
    ) {
        let message = failure_message(err, partial_message);
        error!(
            task_id = %self.task_id,
            command_id = %self.command_id,
            instance_id = %self.instance_id,
            error = %err,
            "task failed"
        );
        self.send(ctx, notifier, message, true, false).await;
    }

    /// Delivers one notification. `in_progress` marks messages about work
    /// that is still running; only those may be cancelable.
    async fn send(
        &self,
        ctx: &TaskContext,
        notifier: &dyn Notifier,
        message: String,
        error_occurred: bool,
        in_progress: bool,
    ) {
        let notification = self.notification(message, error_occurred, in_progress);
        self.deliver(ctx, notifier, notification).await;
    }

    /// Builds a plain-text notification about this run.
    fn notification(&self, message: String, error_occurred: bool, in_progress: bool) -> Notification {
        Notification {
            notifier_id: self.notifier_id.clone(),
            task_id: self.task_id.clone(),
            command_id: self.command_id.clone(),
            instance_id: self.instance_id.clone(),
            message,
            detail: String::new(),
            formatted: false,
            elapsed: self.elapsed(),
            error_occurred,
            cancelable: in_progress && self.run_by == RunBy::User,
        }
    }

    async fn deliver(&self, ctx: &TaskContext, notifier: &dyn Notifier, notification: Notification) {
        if let Err(e) = notifier.notify(ctx, notification).await {
            warn!(
                task_id = %self.task_id,
                instance_id = %self.instance_id,
                notifier_id = %self.notifier_id,
                error = %e,
                "failed to deliver notification"
            );
        }
    }

    fn mark_started(&self) {
        let mut started_at = self
            .started_at
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *started_at = Some(Instant::now());
    }

    fn set_state(&self, next: TaskState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.can_transition_to(next) {
            *state = next;
        } else {
            debug!(
                task_id = %self.task_id,
                from = ?*state,
                to = ?next,
                "ignoring invalid state transition"
            );
        }
    }

    /// Publishes the cancel handle for the duration of the run.
    fn install_cancel_handle(&self, token: CancellationToken) -> CancelHandleGuard<'_> {
        {
            let mut handle = self
                .cancel_handle
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *handle = Some(token.clone());
        }
        // cancel() may have run between the pre-flight check and now.
        if self.is_canceled() {
            token.cancel();
        }
        CancelHandleGuard { runtime: self }
    }
}

/// Clears the cancel handle when the run exits, so a late `cancel()` is a no-op.
struct CancelHandleGuard<'a> {
    runtime: &'a TaskRuntime,
}

impl Drop for CancelHandleGuard<'_> {
    fn drop(&mut self) {
        let mut handle = self
            .runtime
            .cancel_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *handle = None;
    }
}

/// Builds the text of a failure notification.
fn failure_message(err: &TaskError, partial_message: &str) -> String {
    let mut message = format!("{}\n\n{}", FAILURE_PREAMBLE, err);
    if !partial_message.is_empty() {
        message.push_str("\n\n");
        message.push_str(partial_message);
    }
    message
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
