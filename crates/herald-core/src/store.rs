//! Result store contract.

use async_trait::async_trait;
use thiserror::Error;

use crate::ids::{CommandId, TaskId};
use crate::snapshot::Snapshot;

/// Errors returned by a [`ResultStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// No snapshot has been saved yet. Treated as a first run.
    #[error("no snapshot saved for {task_id}/{command_id}")]
    NotFound { task_id: String, command_id: String },

    /// A snapshot exists but cannot be decoded.
    #[error("snapshot for {task_id}/{command_id} is corrupted: {reason}")]
    Corrupted {
        task_id: String,
        command_id: String,
        reason: String,
    },

    /// Failed to serialize a snapshot.
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The storage backend failed (filesystem, lock, ...).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Builds a not-found error for the given task and command.
    pub fn not_found(task_id: &TaskId, command_id: &CommandId) -> Self {
        StoreError::NotFound {
            task_id: task_id.to_string(),
            command_id: command_id.to_string(),
        }
    }

    /// Returns true if this is the first-run sentinel.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Outcome of a successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The snapshot was loaded and is current.
    Fresh,
    /// The snapshot was loaded but the store considers it outdated.
    /// Execution continues; interactive runs are warned.
    Stale { reason: String },
}

/// Persistence for task result snapshots.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Loads the previous snapshot into `snapshot`.
    ///
    /// Returns [`StoreError::NotFound`] when nothing was saved yet.
    async fn load(
        &self,
        task_id: &TaskId,
        command_id: &CommandId,
        snapshot: &mut dyn Snapshot,
    ) -> Result<LoadOutcome, StoreError>;

    /// Saves a new snapshot, replacing the previous one.
    async fn save(
        &self,
        task_id: &TaskId,
        command_id: &CommandId,
        snapshot: &dyn Snapshot,
    ) -> Result<(), StoreError>;
}
