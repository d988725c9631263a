//! Core of Herald: the task registry and the task execution runtime.
//!
//! A task is a named unit of background work (a price watcher, a backup
//! check, ...) that exposes one or more commands. Each command can carry a
//! snapshot of its last result so that the next run only reports changes.
//!
//! - [`Registry`] maps task ids to their [`TaskConfig`] and resolves a
//!   command id, exact or by wildcard pattern, to a [`ResolvedConfig`].
//! - [`TaskRuntime`] runs one execution of one command: load the previous
//!   snapshot, call the business logic, save the new snapshot and report
//!   through a [`Notifier`].
//! - [`ResultStore`] and [`Notifier`] are the seams to storage and delivery.
//!
//! # Example
//!
//! ```ignore
//! use herald_core::*;
//! use std::sync::Arc;
//!
//! let registry = Registry::new();
//! let config = TaskConfig::new(Arc::new(|params: NewTaskParams| {
//!     Ok(TaskRuntime::from_params(&params).with_execute(execute_fn(
//!         |_ctx, _snapshot, _rich| async { Ok(ExecuteOutput::message("hello")) },
//!     )))
//! }))
//! .with_command(CommandConfig::new("Ping", snapshot_factory::<()>()));
//! registry.register(&"echo".into(), &config)?;
//!
//! let resolved = registry.find_config(&"echo".into(), &"Ping".into())?;
//! let runtime = resolved.new_task(NewTaskParams {
//!     instance_id: InstanceId::new(),
//!     request: TaskRequest::new("echo", "Ping", "log", RunBy::User),
//!     resolved: resolved.clone(),
//!     store: Some(store),
//! })?;
//! runtime.run(&TaskContext::new(), &notifier).await;
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod ids;
pub mod notification;
pub mod registry;
pub mod runtime;
pub mod snapshot;
pub mod store;

pub use config::{CommandConfig, NewTaskParams, ResolvedConfig, TaskConfig, TaskFactory, TaskRequest};
pub use context::TaskContext;
pub use error::{ErrorKind, Result, TaskError};
pub use ids::{CommandId, InstanceId, NotifierId, TaskId};
pub use notification::{Notification, Notifier, NotifyError, RunBy};
pub use registry::Registry;
pub use runtime::{
    execute_fn, ExecuteFailure, ExecuteFn, ExecuteOutput, TaskRuntime, TaskState,
    FAILURE_PREAMBLE, SAVE_FAILURE_WARNING,
};
pub use snapshot::{snapshot_factory, Snapshot, SnapshotFactory};
pub use store::{LoadOutcome, ResultStore, StoreError};
