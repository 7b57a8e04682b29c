//! KvdbHandler: per-(database, scope) lease
//!
//! A handler is the only way a scope reads or writes a database. Holding
//! one counts as one reference on its `(db, scope)` pair; dropping it gives
//! the reference back. Consumers never have to release explicitly.
//!
//! ## Thread Safety
//!
//! `KvdbHandler` is `Send + Sync`. It is deliberately not `Clone`: a second
//! lease must come from [`KvdbManager::get_kvdb_handler`] so it is counted.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use kvdb_core::{KvStore, KvdbResult};
use serde_json::Value;

use crate::manager::KvdbManager;

/// Lease on one database for one scope
pub struct KvdbHandler {
    db_name: String,
    scope_name: String,
    store: Arc<dyn KvStore>,
    /// Non-owning; the manager normally outlives its handlers
    manager: Weak<KvdbManager>,
}

impl KvdbHandler {
    pub(crate) fn new(
        manager: Weak<KvdbManager>,
        db_name: String,
        scope_name: String,
        store: Arc<dyn KvStore>,
    ) -> Self {
        Self {
            db_name,
            scope_name,
            store,
            manager,
        }
    }

    /// Database this handler is bound to
    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    /// Scope this handler was leased to
    pub fn scope_name(&self) -> &str {
        &self.scope_name
    }

    /// Get the value stored under `key`
    pub fn get(&self, key: &str) -> KvdbResult<Option<Value>> {
        self.store.get(key)
    }

    /// Store `value` under `key`
    pub fn set(&self, key: &str, value: Value) -> KvdbResult<()> {
        self.store.put(key, value)
    }

    /// Store `key` with a `null` value
    ///
    /// Used for set-like databases where only key presence matters.
    pub fn add(&self, key: &str) -> KvdbResult<()> {
        self.store.put(key, Value::Null)
    }

    /// Remove `key`; returns whether it existed
    pub fn remove(&self, key: &str) -> KvdbResult<bool> {
        self.store.delete(key)
    }

    /// Whether `key` is present
    pub fn contains(&self, key: &str) -> KvdbResult<bool> {
        self.store.contains(key)
    }

    /// Full copy of the database contents
    pub fn dump(&self) -> KvdbResult<BTreeMap<String, Value>> {
        self.store.dump()
    }

    /// Entries whose key starts with `prefix`, in key order
    pub fn search(&self, prefix: &str) -> KvdbResult<Vec<(String, Value)>> {
        self.store.scan_prefix(prefix)
    }

    /// Give the reference back now
    ///
    /// Equivalent to dropping the handler.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for KvdbHandler {
    fn drop(&mut self) {
        // Gone or shutting down: the registry may already be torn down.
        let Some(manager) = self.manager.upgrade() else {
            return;
        };
        if manager.manager_shutting_down() {
            return;
        }
        manager.remove_kvdb_handler(&self.db_name, &self.scope_name);
    }
}

impl std::fmt::Debug for KvdbHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvdbHandler")
            .field("db_name", &self.db_name)
            .field("scope_name", &self.scope_name)
            .finish_non_exhaustive()
    }
}
