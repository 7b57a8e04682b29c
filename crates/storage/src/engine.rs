//! Storage engines
//!
//! A `StorageEngine` turns database names into backing stores. The manager
//! only orchestrates naming and registration; creating directories, reading
//! import files and removing data all happen here.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kvdb_core::{validate_db_name, Error, KvStore, KvdbResult};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::data_file::DATA_FILE_NAME;
use crate::durability::DurabilityMode;
use crate::file_store::FileStore;
use crate::import::read_import_file;
use crate::memory::MemoryStore;

/// Factory for named key-value stores
///
/// Thread safety: callers serialize operations on the same name; the
/// manager does so by holding its registry lock.
pub trait StorageEngine: Send + Sync {
    /// Create a new store named `name` holding `entries`
    ///
    /// Fails with `AlreadyExists` if the engine already has data for `name`.
    fn create_with_entries(
        &self,
        name: &str,
        entries: BTreeMap<String, Value>,
    ) -> KvdbResult<Arc<dyn KvStore>>;

    /// Create a new, empty store named `name`
    fn create(&self, name: &str) -> KvdbResult<Arc<dyn KvStore>> {
        self.create_with_entries(name, BTreeMap::new())
    }

    /// Create a store named `name` from the import file at `path`
    ///
    /// The file is parsed before anything is created, so a bad file leaves
    /// no trace behind.
    fn import(&self, name: &str, path: &Path) -> KvdbResult<Arc<dyn KvStore>> {
        let entries = read_import_file(path)?;
        self.create_with_entries(name, entries)
    }

    /// Open the existing store named `name`
    fn open(&self, name: &str) -> KvdbResult<Arc<dyn KvStore>>;

    /// Remove all data for `name`
    fn destroy(&self, name: &str) -> KvdbResult<()>;

    /// Names of databases already present in the engine, sorted
    fn discover(&self) -> KvdbResult<Vec<String>>;
}

// ============================================================================
// Disk engine
// ============================================================================

/// One directory per database under a common root
///
/// ```text
/// <root>/
///   kvdb.toml
///   geo/data.kvdb
///   cdb1/data.kvdb
/// ```
#[derive(Debug, Clone)]
pub struct DiskEngine {
    root: PathBuf,
    durability: DurabilityMode,
}

impl DiskEngine {
    /// Engine rooted at `root`, creating the directory if needed
    pub fn new(root: impl Into<PathBuf>, durability: DurabilityMode) -> KvdbResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root, durability })
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir_for(&self, name: &str) -> KvdbResult<PathBuf> {
        validate_db_name(name)?;
        Ok(self.root.join(name))
    }
}

impl StorageEngine for DiskEngine {
    fn create_with_entries(
        &self,
        name: &str,
        entries: BTreeMap<String, Value>,
    ) -> KvdbResult<Arc<dyn KvStore>> {
        let dir = self.dir_for(name)?;
        if dir.join(DATA_FILE_NAME).exists() {
            return Err(Error::already_exists(name));
        }
        if dir.exists() {
            // Without a data file the directory is not a database
            warn!(target: "kvdb::storage", db = name, dir = ?dir, "Clearing leftover directory");
            std::fs::remove_dir_all(&dir)?;
        }

        let count = entries.len();
        match FileStore::create_with_entries(&dir, entries, self.durability) {
            Ok(store) => {
                info!(target: "kvdb::storage", db = name, entries = count, "Created database");
                Ok(Arc::new(store))
            }
            Err(e) => {
                // Leave nothing half-created behind
                if let Err(cleanup) = std::fs::remove_dir_all(&dir) {
                    warn!(
                        target: "kvdb::storage",
                        db = name,
                        error = %cleanup,
                        "Failed to clean up partially created database"
                    );
                }
                Err(e)
            }
        }
    }

    fn open(&self, name: &str) -> KvdbResult<Arc<dyn KvStore>> {
        let dir = self.dir_for(name)?;
        if !dir.join(DATA_FILE_NAME).exists() {
            return Err(Error::not_found(name));
        }
        Ok(Arc::new(FileStore::open(&dir, self.durability)?))
    }

    fn destroy(&self, name: &str) -> KvdbResult<()> {
        let dir = self.dir_for(name)?;
        if !dir.exists() {
            return Err(Error::not_found(name));
        }
        std::fs::remove_dir_all(&dir)?;
        info!(target: "kvdb::storage", db = name, "Destroyed database");
        Ok(())
    }

    fn discover(&self) -> KvdbResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if validate_db_name(&name).is_err() {
                continue;
            }
            if !entry.path().join(DATA_FILE_NAME).exists() {
                debug!(target: "kvdb::storage", dir = ?entry.path(), "Skipping directory without data file");
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }
}

// ============================================================================
// Memory engine
// ============================================================================

/// Engine that keeps every store in memory
///
/// Nothing is written to disk and nothing survives the engine.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    stores: Mutex<BTreeMap<String, Arc<MemoryStore>>>,
}

impl MemoryEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageEngine for MemoryEngine {
    fn create_with_entries(
        &self,
        name: &str,
        entries: BTreeMap<String, Value>,
    ) -> KvdbResult<Arc<dyn KvStore>> {
        validate_db_name(name)?;
        let mut stores = self.stores.lock();
        if stores.contains_key(name) {
            return Err(Error::already_exists(name));
        }
        let store = Arc::new(MemoryStore::with_entries(entries));
        stores.insert(name.to_string(), Arc::clone(&store));
        Ok(store)
    }

    fn open(&self, name: &str) -> KvdbResult<Arc<dyn KvStore>> {
        match self.stores.lock().get(name) {
            Some(store) => Ok(Arc::clone(store) as Arc<dyn KvStore>),
            None => Err(Error::not_found(name)),
        }
    }

    fn destroy(&self, name: &str) -> KvdbResult<()> {
        match self.stores.lock().remove(name) {
            Some(_) => Ok(()),
            None => Err(Error::not_found(name)),
        }
    }

    fn discover(&self) -> KvdbResult<Vec<String>> {
        Ok(self.stores.lock().keys().cloned().collect())
    }
}
