//! Registry of task configurations.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use regex::Regex;
use tracing::{debug, info};

use crate::config::{ResolvedConfig, TaskConfig};
use crate::error::{Result, TaskError};
use crate::ids::{CommandId, TaskId};

/// A stored task config plus compiled wildcard patterns, one per command.
struct Entry {
    config: TaskConfig,
    patterns: Vec<Option<Regex>>,
}

/// Thread-safe catalogue of runnable task configurations.
///
/// Everything handed in or out is a copy: `register` clones the caller's
/// config and `find_config` clones the stored one, so no caller ever holds
/// a reference into registry-owned state.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use herald_core::{snapshot_factory, CommandConfig, Registry, TaskConfig, TaskError, TaskId};
///
/// let registry = Registry::new();
/// let config = TaskConfig::new(Arc::new(|_| Err(TaskError::Internal("unused".into()))))
///     .with_command(CommandConfig::new("Watch*", snapshot_factory::<Vec<String>>()));
///
/// registry.register(&TaskId::from("news"), &config).unwrap();
///
/// let resolved = registry.find_config(&"news".into(), &"WatchSports".into()).unwrap();
/// assert_eq!(resolved.command().id.as_str(), "Watch*");
/// ```
#[derive(Default)]
pub struct Registry {
    entries: RwLock<HashMap<TaskId, Entry>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers a task config.
    ///
    /// Fails with `InvalidInput` for malformed IDs, empty command lists,
    /// duplicate command IDs or missing/degenerate snapshot factories, and
    /// with `Conflict` if the task ID is already registered.
    pub fn register(&self, task_id: &TaskId, config: &TaskConfig) -> Result<()> {
        let patterns = validate(task_id, config)?;

        let mut entries = self.write()?;
        if entries.contains_key(task_id) {
            return Err(TaskError::Conflict(format!(
                "task '{}' is already registered",
                task_id
            )));
        }

        entries.insert(
            task_id.clone(),
            Entry {
                config: config.clone(),
                patterns,
            },
        );

        info!(
            task_id = %task_id,
            commands = config.commands.len(),
            "task registered"
        );
        Ok(())
    }

    /// Registers a task config, panicking on any validation error.
    ///
    /// Meant for process start-up, where a malformed provider is a bug.
    pub fn must_register(&self, task_id: &TaskId, config: &TaskConfig) {
        if let Err(e) = self.register(task_id, config) {
            panic!("failed to register task '{}': {}", task_id, e);
        }
    }

    /// Resolves a task and command to a private copy of the task config.
    ///
    /// An exact command match wins over a wildcard match. Unknown tasks and
    /// unsupported commands are both `NotFound`; the latter lists the
    /// commands the task does support.
    pub fn find_config(&self, task_id: &TaskId, command_id: &CommandId) -> Result<ResolvedConfig> {
        let entries = self.read()?;

        let entry = entries
            .get(task_id)
            .ok_or_else(|| TaskError::NotFound(format!("task '{}' is not supported", task_id)))?;

        let exact = entry
            .config
            .commands
            .iter()
            .position(|c| c.id == *command_id);

        let index = exact.or_else(|| {
            entry.patterns.iter().position(|pattern| {
                pattern
                    .as_ref()
                    .is_some_and(|re| re.is_match(command_id.as_str()))
            })
        });

        match index {
            Some(index) => {
                debug!(
                    task_id = %task_id,
                    command_id = %command_id,
                    matched = %entry.config.commands[index].id,
                    "config resolved"
                );
                Ok(ResolvedConfig::new(entry.config.clone(), index))
            }
            None => {
                let supported: Vec<&str> = entry
                    .config
                    .commands
                    .iter()
                    .map(|c| c.id.as_str())
                    .collect();
                Err(TaskError::NotFound(format!(
                    "command '{}' is not supported by task '{}' (supported commands: {})",
                    command_id,
                    task_id,
                    supported.join(", ")
                )))
            }
        }
    }

    /// Returns the registered task IDs, sorted.
    pub fn task_ids(&self) -> Result<Vec<TaskId>> {
        let entries = self.read()?;
        let mut ids: Vec<TaskId> = entries.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    /// Returns a copy of a registered task config.
    pub fn task_config(&self, task_id: &TaskId) -> Result<Option<TaskConfig>> {
        let entries = self.read()?;
        Ok(entries.get(task_id).map(|e| e.config.clone()))
    }

    /// Returns the number of registered tasks.
    pub fn len(&self) -> usize {
        self.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Returns true if no tasks are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores a config without any validation.
    #[cfg(any(test, feature = "test-util"))]
    pub fn register_for_test(&self, task_id: &TaskId, config: &TaskConfig) {
        let patterns = config
            .commands
            .iter()
            .map(|c| compile_pattern(&c.id).ok().flatten())
            .collect();
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                task_id.clone(),
                Entry {
                    config: config.clone(),
                    patterns,
                },
            );
        }
    }

    /// Removes every registration.
    #[cfg(any(test, feature = "test-util"))]
    pub fn clear_for_test(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<TaskId, Entry>>> {
        self.entries
            .read()
            .map_err(|e| TaskError::Internal(format!("registry lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<TaskId, Entry>>> {
        self.entries
            .write()
            .map_err(|e| TaskError::Internal(format!("registry lock poisoned: {}", e)))
    }
}

/// Checks a config and compiles its command patterns.
fn validate(task_id: &TaskId, config: &TaskConfig) -> Result<Vec<Option<Regex>>> {
    if !task_id.is_well_formed() {
        return Err(TaskError::InvalidInput(format!(
            "invalid task id '{}'",
            task_id
        )));
    }

    if config.commands.is_empty() {
        return Err(TaskError::InvalidInput(format!(
            "task '{}' has no commands",
            task_id
        )));
    }

    let mut seen = HashSet::new();
    let mut patterns = Vec::with_capacity(config.commands.len());

    for command in &config.commands {
        if !command.id.is_well_formed() {
            return Err(TaskError::InvalidInput(format!(
                "task '{}' has an invalid command id '{}'",
                task_id, command.id
            )));
        }

        if !seen.insert(command.id.as_str()) {
            return Err(TaskError::InvalidInput(format!(
                "task '{}' declares command '{}' more than once",
                task_id, command.id
            )));
        }

        let factory = command.new_snapshot.as_ref().ok_or_else(|| {
            TaskError::InvalidInput(format!(
                "command '{}' of task '{}' has no snapshot factory",
                command.id, task_id
            ))
        })?;

        if factory().is_none() {
            return Err(TaskError::InvalidInput(format!(
                "snapshot factory of command '{}' in task '{}' returned nothing",
                command.id, task_id
            )));
        }

        patterns.push(compile_pattern(&command.id)?);
    }

    Ok(patterns)
}

/// Compiles a wildcard command ID into an anchored regex.
///
/// `*` matches any run of characters, `?` exactly one. Literal IDs yield `None`.
fn compile_pattern(id: &CommandId) -> Result<Option<Regex>> {
    if !id.is_pattern() {
        return Ok(None);
    }

    let mut source = String::from("^");
    for c in id.as_str().chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(&other.to_string())),
        }
    }
    source.push('$');

    Regex::new(&source)
        .map(Some)
        .map_err(|e| TaskError::InvalidInput(format!("invalid command pattern '{}': {}", id, e)))
}
