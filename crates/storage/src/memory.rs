//! In-memory store with no disk I/O

use std::collections::BTreeMap;

use kvdb_core::{KvStore, KvdbResult};
use parking_lot::RwLock;
use serde_json::Value;

/// BTreeMap-backed store that lives only as long as the process
///
/// Used by ephemeral managers and tests. `flush()` is a no-op.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `entries`
    pub fn with_entries(entries: BTreeMap<String, Value>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> KvdbResult<Option<Value>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: Value) -> KvdbResult<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> KvdbResult<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn contains(&self, key: &str) -> KvdbResult<bool> {
        Ok(self.entries.read().contains_key(key))
    }

    fn scan_prefix(&self, prefix: &str) -> KvdbResult<Vec<(String, Value)>> {
        Ok(scan(&self.entries.read(), prefix))
    }

    fn dump(&self) -> KvdbResult<BTreeMap<String, Value>> {
        Ok(self.entries.read().clone())
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn flush(&self) -> KvdbResult<()> {
        Ok(())
    }
}

/// Entries of `map` whose key starts with `prefix`, in key order
pub(crate) fn scan(map: &BTreeMap<String, Value>, prefix: &str) -> Vec<(String, Value)> {
    map.range(prefix.to_string()..)
        .take_while(|(k, _)| k.starts_with(prefix))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
