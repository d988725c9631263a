//! In-process result store.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use herald_core::{CommandId, LoadOutcome, ResultStore, Snapshot, StoreError, TaskId};

/// Keeps snapshots as JSON values in memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    snapshots: RwLock<HashMap<(TaskId, CommandId), serde_json::Value>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw JSON saved for a command, if any.
    pub fn get(&self, task_id: &TaskId, command_id: &CommandId) -> Option<serde_json::Value> {
        self.snapshots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(task_id.clone(), command_id.clone()))
            .cloned()
    }

    /// Seeds the store with raw JSON.
    pub fn insert(&self, task_id: TaskId, command_id: CommandId, value: serde_json::Value) {
        self.snapshots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((task_id, command_id), value);
    }

    pub fn len(&self) -> usize {
        self.snapshots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn load(
        &self,
        task_id: &TaskId,
        command_id: &CommandId,
        snapshot: &mut dyn Snapshot,
    ) -> Result<LoadOutcome, StoreError> {
        let value = self
            .get(task_id, command_id)
            .ok_or_else(|| StoreError::not_found(task_id, command_id))?;
        snapshot
            .load_json(value)
            .map_err(|e| StoreError::Corrupted {
                task_id: task_id.to_string(),
                command_id: command_id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(LoadOutcome::Fresh)
    }

    async fn save(
        &self,
        task_id: &TaskId,
        command_id: &CommandId,
        snapshot: &dyn Snapshot,
    ) -> Result<(), StoreError> {
        let value = snapshot.to_json()?;
        self.insert(task_id.clone(), command_id.clone(), value);
        Ok(())
    }
}
