// Durable key-value layer
// Everything above this crate only ever sees string keys and string blobs.

pub mod error;
pub mod memory;
pub mod sqlite;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Port over a flat, durable key-value store
///
/// This is the browser's `localStorage` contract in trait form: string keys,
/// string values, whole-value reads and writes. No transactions, no partial
/// updates, last writer wins.
///
/// Methods take `&self` so one store can be shared behind an `Arc` across
/// whatever needs it.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` if nothing is there
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the value stored under `key`
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Drop `key` entirely. Removing a missing key is fine.
    fn remove(&self, key: &str) -> Result<()>;
}
