//! Type-erased result snapshots.
//!
//! A snapshot is whatever a task wants to remember between runs. Any
//! serde-serializable, cloneable type can be used; the runtime and result
//! stores only see `dyn Snapshot` and move it through JSON.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A persisted task result.
pub trait Snapshot: Any + Send + Sync + fmt::Debug {
    /// Serializes the snapshot to JSON.
    fn to_json(&self) -> serde_json::Result<serde_json::Value>;

    /// Replaces the contents of this snapshot with the given JSON.
    fn load_json(&mut self, value: serde_json::Value) -> serde_json::Result<()>;

    /// Clones into a new box.
    fn clone_box(&self) -> Box<dyn Snapshot>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T> Snapshot for T
where
    T: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static,
{
    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    fn load_json(&mut self, value: serde_json::Value) -> serde_json::Result<()> {
        *self = serde_json::from_value(value)?;
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn Snapshot> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl dyn Snapshot {
    /// Returns the concrete snapshot if it is a `T`.
    pub fn downcast_ref<T: Snapshot>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Returns the concrete snapshot mutably if it is a `T`.
    pub fn downcast_mut<T: Snapshot>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

impl Clone for Box<dyn Snapshot> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Factory producing an empty snapshot holder.
///
/// Returning `None` marks the factory as degenerate; the registry refuses
/// such commands.
pub type SnapshotFactory = Arc<dyn Fn() -> Option<Box<dyn Snapshot>> + Send + Sync>;

/// Builds a factory that yields `T::default()`.
pub fn snapshot_factory<T>() -> SnapshotFactory
where
    T: Snapshot + Default,
{
    Arc::new(|| Some(Box::new(T::default()) as Box<dyn Snapshot>))
}
