//! File-backed result store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use herald_core::{CommandId, LoadOutcome, ResultStore, Snapshot, StoreError, TaskId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::atomic::{read_optional, write_atomic};
use crate::error::PersistenceError;

/// Version of the on-disk envelope written by this store.
pub const FORMAT_VERSION: u32 = 1;

/// What is written to disk around a snapshot.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    format: u32,
    saved_at: DateTime<Utc>,
    snapshot: serde_json::Value,
}

/// Stores one JSON file per task command.
///
/// ```text
/// base_path/
/// └── snapshots/
///     └── {task_id}/
///         └── {command_id}.json
/// ```
///
/// A snapshot older than `max_age`, or written in an older envelope format,
/// still loads but is reported as [`LoadOutcome::Stale`].
#[derive(Debug, Clone)]
pub struct FileResultStore {
    base_path: PathBuf,
    max_age: Option<Duration>,
}

impl FileResultStore {
    /// Creates a store rooted at `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            max_age: None,
        }
    }

    /// Reports snapshots older than `max_age` as stale.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Returns the file a command's snapshot lives in.
    pub fn snapshot_path(&self, task_id: &TaskId, command_id: &CommandId) -> PathBuf {
        self.base_path
            .join("snapshots")
            .join(file_component(task_id.as_str()))
            .join(format!("{}.json", file_component(command_id.as_str())))
    }

    fn staleness(&self, envelope: &Envelope) -> Option<String> {
        if envelope.format < FORMAT_VERSION {
            return Some(format!(
                "saved in format {} (current is {})",
                envelope.format, FORMAT_VERSION
            ));
        }
        let max_age = self.max_age?;
        let age = Utc::now().signed_duration_since(envelope.saved_at);
        (age > max_age).then(|| format!("saved {} minutes ago", age.num_minutes()))
    }
}

#[async_trait]
impl ResultStore for FileResultStore {
    async fn load(
        &self,
        task_id: &TaskId,
        command_id: &CommandId,
        snapshot: &mut dyn Snapshot,
    ) -> Result<LoadOutcome, StoreError> {
        let path = self.snapshot_path(task_id, command_id);
        let read_path = path.clone();
        let bytes = tokio::task::spawn_blocking(move || read_optional(&read_path))
            .await
            .map_err(|e| PersistenceError::TaskAborted(e.to_string()))??;

        let Some(bytes) = bytes else {
            debug!(path = %path.display(), "no snapshot file");
            return Err(StoreError::not_found(task_id, command_id));
        };

        let corrupted = |reason: String| StoreError::Corrupted {
            task_id: task_id.to_string(),
            command_id: command_id.to_string(),
            reason,
        };

        let envelope: Envelope =
            serde_json::from_slice(&bytes).map_err(|e| corrupted(e.to_string()))?;
        if envelope.format > FORMAT_VERSION {
            return Err(corrupted(format!(
                "written in format {} by a newer version",
                envelope.format
            )));
        }

        let stale = self.staleness(&envelope);
        snapshot
            .load_json(envelope.snapshot)
            .map_err(|e| corrupted(e.to_string()))?;

        match stale {
            Some(reason) => {
                warn!(
                    task_id = %task_id,
                    command_id = %command_id,
                    reason = %reason,
                    "loaded stale snapshot"
                );
                Ok(LoadOutcome::Stale { reason })
            }
            None => Ok(LoadOutcome::Fresh),
        }
    }

    async fn save(
        &self,
        task_id: &TaskId,
        command_id: &CommandId,
        snapshot: &dyn Snapshot,
    ) -> Result<(), StoreError> {
        let envelope = Envelope {
            format: FORMAT_VERSION,
            saved_at: Utc::now(),
            snapshot: snapshot.to_json()?,
        };
        let data = serde_json::to_vec_pretty(&envelope)?;
        let path = self.snapshot_path(task_id, command_id);

        debug!(
            task_id = %task_id,
            command_id = %command_id,
            path = %path.display(),
            bytes = data.len(),
            "saving snapshot"
        );

        tokio::task::spawn_blocking(move || write_atomic(&path, &data))
            .await
            .map_err(|e| PersistenceError::TaskAborted(e.to_string()))??;
        Ok(())
    }
}

/// Maps an id to a single path component, one id per name.
///
/// ASCII letters, digits, `-`, `_` and `.` are kept; every other byte is
/// written as `%XX`. Names made only of dots are fully escaped.
fn file_component(id: &str) -> String {
    let keep_dots = !id.chars().all(|c| c == '.');
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => out.push(byte as char),
            b'.' if keep_dots => out.push('.'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
