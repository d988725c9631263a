//! Result stores for Herald.
//!
//! Two [`ResultStore`](herald_core::ResultStore) implementations:
//!
//! - [`FileResultStore`] keeps one JSON file per task command and writes it
//!   atomically (temp file, then rename), so a crash never leaves a
//!   half-written snapshot behind.
//! - [`MemoryResultStore`] keeps everything in memory, for tests and dry runs.
//!
//! # Example
//!
//! ```no_run
//! use herald_persistence::FileResultStore;
//!
//! let store = FileResultStore::new("/home/user/.herald")
//!     .with_max_age(chrono::Duration::days(7));
//! ```

pub mod atomic;
pub mod error;
pub mod file_store;
pub mod memory_store;

pub use error::{PersistenceError, Result};
pub use file_store::{FileResultStore, FORMAT_VERSION};
pub use memory_store::MemoryResultStore;
