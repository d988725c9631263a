//! Tasks whose commands run external programs.
//!
//! Each command runs a program, keeps its standard output as the snapshot
//! and reports only when the output changed since the previous run, unless
//! `notify_unchanged` is set. A non-zero exit is an execution failure with
//! the tail of standard error as partial output. Cancellation kills the
//! child process.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use herald_core::{
    execute_fn, snapshot_factory, CommandConfig, CommandId, ExecuteFailure, ExecuteOutput,
    NewTaskParams, Snapshot, TaskConfig, TaskContext, TaskError, TaskRuntime,
};
use herald_telegram::format::escape_html;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::settings::{ProcessCommandSettings, ProcessTaskSettings};

/// Lines of standard error kept in a failure report.
const STDERR_TAIL_LINES: usize = 20;

/// Last observed result of a process command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub output: String,
    pub exit_code: Option<i32>,
    pub checked_at: Option<DateTime<Utc>>,
}

/// How to run one command.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub workdir: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub notify_unchanged: bool,
}

impl From<&ProcessCommandSettings> for ProcessSpec {
    fn from(settings: &ProcessCommandSettings) -> Self {
        Self {
            program: settings.program.clone(),
            args: settings.args.clone(),
            workdir: settings.workdir(),
            timeout: settings.timeout(),
            notify_unchanged: settings.notify_unchanged,
        }
    }
}

/// Builds the task config for one process task.
pub fn process_task_config(task: &ProcessTaskSettings) -> TaskConfig {
    let specs: Arc<HashMap<CommandId, ProcessSpec>> = Arc::new(
        task.commands
            .iter()
            .map(|c| (CommandId::from(c.id.as_str()), ProcessSpec::from(c)))
            .collect(),
    );

    let config = TaskConfig::new(Arc::new(move |params: NewTaskParams| -> herald_core::Result<TaskRuntime> {
        let command_id = &params.resolved.command().id;
        let spec = specs.get(command_id).cloned().ok_or_else(|| {
            TaskError::Internal(format!("no process spec for command '{}'", command_id))
        })?;
        let spec = Arc::new(spec);
        Ok(TaskRuntime::from_params(&params).with_execute(execute_fn(
            move |ctx, snapshot, rich| run_process(ctx, Arc::clone(&spec), snapshot, rich),
        )))
    }));

    task.commands.iter().fold(config, |config, command| {
        let description = format!("{} {}", command.program, command.args.join(" "))
            .trim_end()
            .to_string();
        config.with_command(
            CommandConfig::new(command.id.as_str(), snapshot_factory::<ProcessSnapshot>())
                .with_description(description)
                .with_allow_multiple(command.allow_multiple),
        )
    })
}

/// Runs the program and compares its output with the previous snapshot.
pub async fn run_process(
    ctx: TaskContext,
    spec: Arc<ProcessSpec>,
    snapshot: Option<Box<dyn Snapshot>>,
    rich: bool,
) -> Result<ExecuteOutput, ExecuteFailure> {
    let previous = snapshot
        .as_deref()
        .and_then(|s| s.downcast_ref::<ProcessSnapshot>())
        .cloned()
        .unwrap_or_default();

    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &spec.workdir {
        command.current_dir(dir);
    }

    let ctx = match spec.timeout {
        Some(timeout) => ctx.with_timeout(timeout),
        None => ctx,
    };

    debug!(program = %spec.program, args = ?spec.args, "running process");
    let output = ctx
        .run_until(command.output())
        .await?
        .map_err(|e| TaskError::System(format!("failed to run '{}': {}", spec.program, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExecuteFailure::with_partial(
            TaskError::ExecutionFailed(format!("'{}' exited with {}", spec.program, output.status)),
            tail(&stderr, STDERR_TAIL_LINES),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
    let changed = previous.checked_at.is_none() || previous.output != stdout;

    let message = if changed || spec.notify_unchanged {
        render_output(&stdout, rich, changed)
    } else {
        String::new()
    };

    Ok(ExecuteOutput {
        message,
        snapshot: Some(Box::new(ProcessSnapshot {
            output: stdout,
            exit_code: output.status.code(),
            checked_at: Some(Utc::now()),
        })),
    })
}

fn render_output(stdout: &str, rich: bool, changed: bool) -> String {
    let body = if stdout.is_empty() { "(no output)" } else { stdout };
    let note = if changed { "" } else { "No change since last run.\n" };
    if rich {
        format!("{}<pre>{}</pre>", escape_html(note), escape_html(body))
    } else {
        format!("{}{}", note, body)
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.trim_end().lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
