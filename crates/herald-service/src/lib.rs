//! Task service for Herald.
//!
//! Wires the task registry and runtime from `herald-core` to a result store
//! and a notifier, and runs task commands on demand, on a schedule and from
//! Telegram:
//! - `TaskService` - spawns runs, enforces limits and cancels on request
//! - `Scheduler` - submits periodic runs
//! - `ServiceCommands` - answers `/run`, `/cancel` and `/tasks`
//! - `Settings` - `herald.toml` plus environment overrides
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use herald_core::{Registry, RunBy, TaskRequest};
//! use herald_persistence::MemoryResultStore;
//! use herald_service::{LogNotifier, ServiceConfig, TaskService};
//!
//! let registry = Arc::new(Registry::new());
//! // register tasks ...
//! let service = TaskService::new(
//!     ServiceConfig::default(),
//!     registry,
//!     Arc::new(MemoryResultStore::new()),
//!     Arc::new(LogNotifier),
//! );
//! let state = service
//!     .run_to_completion(TaskRequest::new("disk", "Usage", "log", RunBy::User))
//!     .await?;
//! ```

pub mod cli;
pub mod commands;
pub mod error;
pub mod event;
pub mod notifier;
pub mod paths;
pub mod scheduler;
pub mod service;
pub mod settings;
pub mod tasks;

pub use commands::{describe_tasks, ServiceCommands};
pub use error::{Result, ServiceError};
pub use event::ServiceEvent;
pub use notifier::LogNotifier;
pub use scheduler::{Schedule, Scheduler};
pub use service::{InstanceInfo, ServiceConfig, TaskService};
pub use settings::Settings;
