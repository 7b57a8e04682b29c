//! File-backed store
//!
//! Keeps the whole database in a `BTreeMap` behind a `parking_lot::RwLock`
//! and rewrites `data.kvdb` as a unit. Reads never touch disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use kvdb_core::{KvStore, KvdbResult};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};

use crate::data_file::{self, DATA_FILE_NAME};
use crate::durability::DurabilityMode;
use crate::memory::scan;

/// Store persisted to a single data file inside its database directory
pub struct FileStore {
    /// Path of `data.kvdb`
    path: PathBuf,
    entries: RwLock<BTreeMap<String, Value>>,
    /// Set by mutations in Standard mode, cleared by flush
    dirty: AtomicBool,
    durability: DurabilityMode,
}

impl FileStore {
    /// Create an empty store in `dir`, writing an empty data file
    pub fn create(dir: &Path, durability: DurabilityMode) -> KvdbResult<Self> {
        Self::create_with_entries(dir, BTreeMap::new(), durability)
    }

    /// Create a store in `dir` holding `entries`
    ///
    /// The data file is written before returning regardless of durability
    /// mode, so a freshly imported database survives a crash.
    pub fn create_with_entries(
        dir: &Path,
        entries: BTreeMap<String, Value>,
        durability: DurabilityMode,
    ) -> KvdbResult<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(DATA_FILE_NAME);
        data_file::write_file(&path, &entries)?;
        Ok(Self {
            path,
            entries: RwLock::new(entries),
            dirty: AtomicBool::new(false),
            durability,
        })
    }

    /// Open the store in `dir`, reading its data file
    pub fn open(dir: &Path, durability: DurabilityMode) -> KvdbResult<Self> {
        let path = dir.join(DATA_FILE_NAME);
        let entries = data_file::read_file(&path)?;
        debug!(target: "kvdb::storage", path = ?path, entries = entries.len(), "Opened data file");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
            dirty: AtomicBool::new(false),
            durability,
        })
    }

    /// Path of the backing data file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a mutation; writes through in Always mode.
    ///
    /// Caller must hold the write lock so concurrent writers cannot
    /// interleave file rewrites.
    fn after_write(&self, entries: &BTreeMap<String, Value>) -> KvdbResult<()> {
        if self.durability.sync_on_write() {
            data_file::write_file(&self.path, entries)
        } else {
            self.dirty.store(true, Ordering::Release);
            Ok(())
        }
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> KvdbResult<Option<Value>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: Value) -> KvdbResult<()> {
        let mut entries = self.entries.write();
        entries.insert(key.to_string(), value);
        self.after_write(&entries)
    }

    fn delete(&self, key: &str) -> KvdbResult<bool> {
        let mut entries = self.entries.write();
        let existed = entries.remove(key).is_some();
        if existed {
            self.after_write(&entries)?;
        }
        Ok(existed)
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
        // Read lock blocks writers, so no mutation can slip between the
        // dirty check and the rewrite.
        let entries = self.entries.read();
        if self.dirty.swap(false, Ordering::AcqRel) {
            if let Err(e) = data_file::write_file(&self.path, &entries) {
                self.dirty.store(true, Ordering::Release);
                return Err(e);
            }
        }
        Ok(())
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(
                target: "kvdb::storage",
                path = ?self.path,
                error = %e,
                "Failed to flush data file on drop"
            );
        }
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .field("durability", &self.durability)
            .finish_non_exhaustive()
    }
}
