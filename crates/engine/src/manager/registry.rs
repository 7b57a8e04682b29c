//! Database registry and scope reference table
//!
//! Both indexes live in one struct so the manager can guard them with a
//! single lock. The scope table (`scope -> db -> count`) is the only place
//! edges are stored; per-database totals are kept next to the database
//! entry and updated in the same call. The `db -> scope` view is derived on
//! read.

use std::collections::BTreeMap;
use std::sync::Arc;

use kvdb_core::{Error, KvStore, KvdbResult, RefInfo};

/// Per-database state
pub(crate) struct DbEntry {
    /// Backing store; None until the database is opened
    pub(crate) store: Option<Arc<dyn KvStore>>,
    /// Sum of all scope edges pointing at this database
    pub(crate) refs: u32,
}

impl DbEntry {
    fn loaded(store: Arc<dyn KvStore>) -> Self {
        Self {
            store: Some(store),
            refs: 0,
        }
    }

    fn unloaded() -> Self {
        Self {
            store: None,
            refs: 0,
        }
    }

    pub(crate) fn is_loaded(&self) -> bool {
        self.store.is_some()
    }
}

/// Databases plus the scope reference table
#[derive(Default)]
pub(crate) struct Registry {
    dbs: BTreeMap<String, DbEntry>,
    scopes: BTreeMap<String, RefInfo>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.dbs.contains_key(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut DbEntry> {
        self.dbs.get_mut(name)
    }

    /// Database names in lexicographic order
    pub(crate) fn names(&self, loaded_only: bool) -> Vec<String> {
        self.dbs
            .iter()
            .filter(|(_, entry)| !loaded_only || entry.is_loaded())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Loaded stores, for flushing
    pub(crate) fn loaded_stores(&self) -> Vec<(String, Arc<dyn KvStore>)> {
        self.dbs
            .iter()
            .filter_map(|(name, entry)| entry.store.as_ref().map(|s| (name.clone(), Arc::clone(s))))
            .collect()
    }

    /// Register a freshly created or imported database
    pub(crate) fn insert_loaded(&mut self, name: &str, store: Arc<dyn KvStore>) -> KvdbResult<()> {
        if self.contains(name) {
            return Err(Error::already_exists(name));
        }
        self.dbs.insert(name.to_string(), DbEntry::loaded(store));
        Ok(())
    }

    /// Register a database known to exist in the engine but not yet opened
    pub(crate) fn insert_unloaded(&mut self, name: &str) -> KvdbResult<()> {
        if self.contains(name) {
            return Err(Error::already_exists(name));
        }
        self.dbs.insert(name.to_string(), DbEntry::unloaded());
        Ok(())
    }

    /// Unregister a database with no outstanding references
    pub(crate) fn remove(&mut self, name: &str) -> KvdbResult<DbEntry> {
        let entry = self.dbs.get(name).ok_or_else(|| Error::not_found(name))?;
        if entry.refs > 0 {
            return Err(Error::InUse {
                name: name.to_string(),
                scopes: self.scopes_referencing(name),
            });
        }
        self.dbs.remove(name).ok_or_else(|| Error::not_found(name))
    }

    /// Scopes holding at least one handler to `db`, sorted
    pub(crate) fn scopes_referencing(&self, db: &str) -> Vec<String> {
        self.scopes
            .iter()
            .filter(|(_, dbs)| dbs.contains_key(db))
            .map(|(scope, _)| scope.clone())
            .collect()
    }

    /// Record one more handler for `(db, scope)`
    ///
    /// Fails with `NotFound` without touching the scope table when `db` is
    /// not registered.
    pub(crate) fn acquire(&mut self, db: &str, scope: &str) -> KvdbResult<()> {
        let entry = self.dbs.get_mut(db).ok_or_else(|| Error::not_found(db))?;
        let total = entry
            .refs
            .checked_add(1)
            .ok_or_else(|| Error::Internal(format!("reference count overflow on '{}'", db)))?;

        let edge = self
            .scopes
            .entry(scope.to_string())
            .or_default()
            .entry(db.to_string())
            .or_insert(0);
        match edge.checked_add(1) {
            Some(count) => *edge = count,
            None => {
                return Err(Error::Internal(format!(
                    "reference count overflow on '{}' for scope '{}'",
                    db, scope
                )))
            }
        }
        entry.refs = total;
        Ok(())
    }

    /// Drop one handler for `(db, scope)`
    ///
    /// Removes the edge when it reaches zero and the scope when it has no
    /// edges left. A release without a matching acquire leaves the table
    /// untouched and reports `Internal`.
    pub(crate) fn release(&mut self, db: &str, scope: &str) -> KvdbResult<()> {
        let dbs = self.scopes.get_mut(scope).ok_or_else(|| {
            Error::Internal(format!("release for unknown scope '{}' on '{}'", scope, db))
        })?;
        let edge = dbs.get_mut(db).ok_or_else(|| {
            Error::Internal(format!("scope '{}' holds no reference to '{}'", scope, db))
        })?;
        let entry = self.dbs.get_mut(db).ok_or_else(|| {
            Error::Internal(format!("edge '{}' -> '{}' points at unregistered database", scope, db))
        })?;
        if entry.refs == 0 {
            return Err(Error::Internal(format!(
                "database '{}' has an edge from '{}' but a zero total",
                db, scope
            )));
        }

        *edge -= 1;
        entry.refs -= 1;
        if *edge == 0 {
            dbs.remove(db);
            if dbs.is_empty() {
                self.scopes.remove(scope);
            }
        }
        Ok(())
    }

    /// `scope -> db -> count`
    pub(crate) fn scopes_info(&self) -> BTreeMap<String, RefInfo> {
        self.scopes.clone()
    }

    /// `db -> scope -> count`, one row per registered database
    pub(crate) fn handlers_info(&self) -> BTreeMap<String, RefInfo> {
        let mut info: BTreeMap<String, RefInfo> = self
            .dbs
            .keys()
            .map(|name| (name.clone(), RefInfo::new()))
            .collect();
        for (scope, dbs) in &self.scopes {
            for (db, count) in dbs {
                info.entry(db.clone())
                    .or_default()
                    .insert(scope.clone(), *count);
            }
        }
        info
    }

    pub(crate) fn ref_count(&self, name: &str) -> Option<u32> {
        self.dbs.get(name).map(|entry| entry.refs)
    }

    /// Every database total equals the sum of its edges, every edge is
    /// positive and points at a registered database.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        let mut sums: BTreeMap<&str, u64> = BTreeMap::new();
        for (scope, dbs) in &self.scopes {
            if dbs.is_empty() {
                return Err(format!("scope '{}' has no edges", scope));
            }
            for (db, count) in dbs {
                if *count == 0 {
                    return Err(format!("edge '{}' -> '{}' is zero", scope, db));
                }
                if !self.dbs.contains_key(db) {
                    return Err(format!("edge '{}' -> '{}' dangles", scope, db));
                }
                *sums.entry(db.as_str()).or_default() += u64::from(*count);
            }
        }
        for (name, entry) in &self.dbs {
            let expected = sums.get(name.as_str()).copied().unwrap_or(0);
            if u64::from(entry.refs) != expected {
                return Err(format!(
                    "database '{}' total {} != edge sum {}",
                    name, entry.refs, expected
                ));
            }
        }
        Ok(())
    }
}
