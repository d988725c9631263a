//! Periodic submission of scheduled task runs.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use herald_core::{CommandId, NotifierId, RunBy, TaskId, TaskRequest};
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::ServiceError;
use crate::service::TaskService;

/// One command to run on a fixed period.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub task_id: TaskId,
    pub command_id: CommandId,
    pub notifier_id: NotifierId,
    pub every: Duration,
}

impl Schedule {
    pub fn new(
        task_id: impl Into<TaskId>,
        command_id: impl Into<CommandId>,
        notifier_id: impl Into<NotifierId>,
        every: Duration,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            command_id: command_id.into(),
            notifier_id: notifier_id.into(),
            every,
        }
    }

    fn request(&self) -> TaskRequest {
        TaskRequest::new(
            self.task_id.clone(),
            self.command_id.clone(),
            self.notifier_id.clone(),
            RunBy::Scheduler,
        )
    }
}

/// Submits [`RunBy::Scheduler`] runs until told to stop.
///
/// The first run of every schedule happens one period after start. A tick
/// that finds the previous run still going is skipped.
pub struct Scheduler {
    service: Arc<TaskService>,
    schedules: Vec<Schedule>,
    shutdown: watch::Receiver<bool>,
}

impl Scheduler {
    /// Creates a new scheduler.
    pub fn new(
        service: Arc<TaskService>,
        schedules: Vec<Schedule>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            service,
            schedules,
            shutdown,
        }
    }

    pub fn schedules(&self) -> &[Schedule] {
        &self.schedules
    }

    /// Run every schedule until the shutdown signal.
    pub async fn run(self) {
        info!(schedules = self.schedules.len(), "starting scheduler");

        let loops = self.schedules.iter().map(|schedule| {
            run_schedule(
                Arc::clone(&self.service),
                schedule.clone(),
                self.shutdown.clone(),
            )
        });
        join_all(loops).await;

        info!("scheduler stopped");
    }
}

async fn run_schedule(
    service: Arc<TaskService>,
    schedule: Schedule,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + schedule.every, schedule.every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    debug!(
        task_id = %schedule.task_id,
        command_id = %schedule.command_id,
        every_secs = schedule.every.as_secs(),
        "schedule armed"
    );

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {
                submit(&service, &schedule).await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    debug!(
        task_id = %schedule.task_id,
        command_id = %schedule.command_id,
        "schedule stopped"
    );
}

async fn submit(service: &TaskService, schedule: &Schedule) {
    match service.submit(schedule.request()).await {
        Ok(instance_id) => {
            debug!(
                task_id = %schedule.task_id,
                command_id = %schedule.command_id,
                instance_id = %instance_id,
                "scheduled run submitted"
            );
        }
        Err(ServiceError::AlreadyRunning { instance_id, .. }) => {
            debug!(
                task_id = %schedule.task_id,
                command_id = %schedule.command_id,
                running = %instance_id,
                "previous run still going; tick skipped"
            );
        }
        Err(e) => {
            warn!(
                task_id = %schedule.task_id,
                command_id = %schedule.command_id,
                error = %e,
                "scheduled run not submitted"
            );
        }
    }
}
