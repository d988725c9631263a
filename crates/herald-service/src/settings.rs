//! Service settings loaded from `herald.toml`.
//!
//! ```toml
//! [telegram]
//! chat_id = "123456789"
//!
//! [service]
//! max_instances = 10
//! default_timeout_secs = 300
//! snapshot_max_age_hours = 168
//!
//! [[process]]
//! id = "disk"
//! description = "Disk usage of the backup volume"
//!
//! [[process.commands]]
//! id = "Usage"
//! program = "df"
//! args = ["-h", "/mnt/backup"]
//! interval_secs = 3600
//! ```
//!
//! Precedence (highest to lowest): environment variables, the settings
//! file, defaults.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use herald_core::{CommandId, TaskId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ServiceError};
use crate::paths;

/// All service settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub telegram: TelegramSettings,
    pub service: ServiceSettings,
    pub process: Vec<ProcessTaskSettings>,
}

/// Telegram delivery. Both values usually come from the environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    pub token: Option<String>,
    pub chat_id: Option<String>,
}

impl TelegramSettings {
    /// True when both token and chat are set.
    pub fn is_configured(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        set(&self.token) && set(&self.chat_id)
    }
}

/// Limits for the task service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Maximum concurrently running instances.
    pub max_instances: usize,
    /// Deadline applied to every run; none when unset.
    pub default_timeout_secs: Option<u64>,
    /// Snapshots older than this are loaded but reported as stale.
    pub snapshot_max_age_hours: Option<u64>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            max_instances: 10,
            default_timeout_secs: None,
            snapshot_max_age_hours: None,
        }
    }
}

impl ServiceSettings {
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_secs.map(Duration::from_secs)
    }
}

/// A task whose commands run external programs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessTaskSettings {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub commands: Vec<ProcessCommandSettings>,
}

/// One program-backed command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessCommandSettings {
    pub id: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory; `~` and variables are expanded.
    #[serde(default)]
    pub workdir: Option<String>,
    /// Run on this period from the scheduler; manual only when unset.
    #[serde(default)]
    pub interval_secs: Option<u64>,
    /// Per-run deadline, overriding the service default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub allow_multiple: bool,
    /// Report every run, not only runs whose output changed.
    #[serde(default)]
    pub notify_unchanged: bool,
}

impl ProcessCommandSettings {
    pub fn interval(&self) -> Option<Duration> {
        self.interval_secs.map(Duration::from_secs)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn workdir(&self) -> Option<PathBuf> {
        self.workdir.as_deref().map(paths::expand)
    }
}

impl Settings {
    /// Loads settings from `path`, or defaults when the file is missing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no settings file; using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServiceError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| ServiceError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parses settings from TOML text.
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Overrides settings with `TELEGRAM_BOT_TOKEN`, `TELEGRAM_CHAT_ID` and
    /// `HERALD_MAX_INSTANCES`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(token) = var("TELEGRAM_BOT_TOKEN") {
            self.telegram.token = Some(token);
        }
        if let Some(chat_id) = var("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = Some(chat_id);
        }
        if let Some(max) = var("HERALD_MAX_INSTANCES").and_then(|v| v.parse().ok()) {
            self.service.max_instances = max;
        }
    }

    /// Checks ids, limits and that every program can be found.
    pub fn validate(&self) -> Result<()> {
        self.validate_with(|program| resolve_program(program).is_some())
    }

    fn validate_with(&self, program_exists: impl Fn(&str) -> bool) -> Result<()> {
        let invalid = |msg: String| Err(ServiceError::Config(msg));

        if self.service.max_instances == 0 {
            return invalid("service.max_instances must be at least 1".to_string());
        }
        if self.service.default_timeout_secs == Some(0) {
            return invalid("service.default_timeout_secs must be positive".to_string());
        }

        let mut task_ids = HashSet::new();
        for task in &self.process {
            if !TaskId::from(task.id.as_str()).is_well_formed() {
                return invalid(format!("invalid task id '{}'", task.id));
            }
            if !task_ids.insert(task.id.as_str()) {
                return invalid(format!("duplicate task id '{}'", task.id));
            }
            if task.commands.is_empty() {
                return invalid(format!("task '{}' has no commands", task.id));
            }

            let mut command_ids = HashSet::new();
            for command in &task.commands {
                let command_id = CommandId::from(command.id.as_str());
                if !command_id.is_well_formed() || command_id.is_pattern() {
                    return invalid(format!(
                        "invalid command id '{}' in task '{}'",
                        command.id, task.id
                    ));
                }
                if !command_ids.insert(command.id.as_str()) {
                    return invalid(format!(
                        "duplicate command id '{}' in task '{}'",
                        command.id, task.id
                    ));
                }
                if command.interval_secs == Some(0) || command.timeout_secs == Some(0) {
                    return invalid(format!(
                        "{}/{}: interval_secs and timeout_secs must be positive",
                        task.id, command.id
                    ));
                }
                if !program_exists(&command.program) {
                    return invalid(format!(
                        "{}/{}: program '{}' not found",
                        task.id, command.id, command.program
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Finds a program on `PATH`, or as a path after `~` expansion.
pub fn resolve_program(program: &str) -> Option<PathBuf> {
    if program.contains('/') {
        let path = paths::expand(program);
        return path.is_file().then_some(path);
    }
    which::which(program).ok()
}
