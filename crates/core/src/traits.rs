//! Core trait for backing key-value stores
//!
//! The manager never touches keys or values itself; it only hands out
//! `Arc<dyn KvStore>` references through handlers. This trait is the seam
//! between the manager and whatever engine persists the data.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::KvdbResult;

/// Storage abstraction for a single named database
///
/// Thread safety: all methods must be safe to call concurrently from
/// multiple threads (requires Send + Sync).
pub trait KvStore: Send + Sync {
    /// Get the value stored under `key`
    ///
    /// Returns None if the key doesn't exist.
    fn get(&self, key: &str) -> KvdbResult<Option<Value>>;

    /// Store `value` under `key`, overwriting any previous value
    fn put(&self, key: &str, value: Value) -> KvdbResult<()>;

    /// Remove `key`
    ///
    /// Returns `true` if the key existed.
    fn delete(&self, key: &str) -> KvdbResult<bool>;

    /// Whether `key` is present
    fn contains(&self, key: &str) -> KvdbResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// All entries whose key starts with `prefix`, in key order
    fn scan_prefix(&self, prefix: &str) -> KvdbResult<Vec<(String, Value)>>;

    /// Full copy of the database contents
    fn dump(&self) -> KvdbResult<BTreeMap<String, Value>>;

    /// Number of entries
    fn len(&self) -> usize;

    /// Whether the store holds no entries
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persist pending changes
    ///
    /// A no-op for stores without a backing file.
    fn flush(&self) -> KvdbResult<()>;
}
