//! Tasks built from settings.

pub mod process;

use herald_core::{CommandId, NotifierId, Registry, TaskId};
use tracing::info;

use crate::scheduler::Schedule;
use crate::settings::ProcessTaskSettings;

pub use process::{process_task_config, run_process, ProcessSnapshot, ProcessSpec};

/// Registers every configured process task.
pub fn register_process_tasks(
    registry: &Registry,
    tasks: &[ProcessTaskSettings],
) -> herald_core::Result<()> {
    for task in tasks {
        let task_id = TaskId::from(task.id.as_str());
        registry.register(&task_id, &process_task_config(task))?;
        info!(task_id = %task_id, commands = task.commands.len(), "process task registered");
    }
    Ok(())
}

/// Schedules for every command with an interval, reported to `notifier_id`.
pub fn schedules_for(tasks: &[ProcessTaskSettings], notifier_id: &NotifierId) -> Vec<Schedule> {
    tasks
        .iter()
        .flat_map(|task| {
            task.commands.iter().filter_map(move |command| {
                command.interval().map(|every| {
                    Schedule::new(
                        TaskId::from(task.id.as_str()),
                        CommandId::from(command.id.as_str()),
                        notifier_id.clone(),
                        every,
                    )
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::settings::ProcessCommandSettings;

    fn command(id: &str, interval_secs: Option<u64>) -> ProcessCommandSettings {
        ProcessCommandSettings {
            id: id.to_string(),
            program: "true".to_string(),
            args: Vec::new(),
            workdir: None,
            interval_secs,
            timeout_secs: None,
            allow_multiple: false,
            notify_unchanged: false,
        }
    }

    fn tasks() -> Vec<ProcessTaskSettings> {
        vec![ProcessTaskSettings {
            id: "backup".to_string(),
            description: None,
            commands: vec![command("Status", Some(300)), command("Manual", None)],
        }]
    }

    #[test]
    fn test_register_process_tasks() {
        let registry = Registry::new();
        register_process_tasks(&registry, &tasks()).unwrap();

        let resolved = registry
            .find_config(&TaskId::from("backup"), &CommandId::from("Manual"))
            .unwrap();
        assert_eq!(resolved.command().id, CommandId::from("Manual"));
        assert!(resolved.command().new_snapshot.is_some());
    }

    #[test]
    fn test_register_twice_conflicts() {
        let registry = Registry::new();
        register_process_tasks(&registry, &tasks()).unwrap();

        assert!(register_process_tasks(&registry, &tasks()).is_err());
    }

    #[test]
    fn test_schedules_only_for_intervals() {
        let schedules = schedules_for(&tasks(), &NotifierId::from("log"));

        assert_eq!(
            schedules,
            vec![Schedule::new("backup", "Status", "log", Duration::from_secs(300))]
        );
    }
}
