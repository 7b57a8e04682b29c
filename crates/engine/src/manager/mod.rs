//! KVDB manager: registry, reference counting and shutdown gating
//!
//! The manager is the single authority over which databases exist and which
//! scopes hold handlers to them. It owns:
//! - The storage engine that creates, opens and destroys backing stores
//! - The registry (databases + scope reference table) behind one RwLock
//! - The one-way shutdown flag
//!
//! ## Locking
//!
//! Every operation that changes the registry (`create_db`,
//! `load_db_from_file`, `delete_db`, `get_kvdb_handler`,
//! `remove_kvdb_handler`) holds the write lock for its whole duration,
//! including the engine call. A handler request racing a deletion therefore
//! lands entirely before or entirely after it. Introspection takes the read
//! lock and never observes a half-applied reference update.
//!
//! ## Shutdown
//!
//! Once `finalize()` runs (or the manager is dropped), handlers stop
//! unregistering themselves: `remove_kvdb_handler` becomes a no-op and the
//! counts are frozen while the process tears down in arbitrary order.

pub mod config;
mod registry;

pub use config::{ManagerConfig, CONFIG_FILE_NAME};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use kvdb_core::{validate_db_name, Error, KvdbResult, RefInfo};
use kvdb_storage::{DiskEngine, MemoryEngine, StorageEngine};
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::handler::KvdbHandler;
use registry::Registry;

/// Reference-counted broker for named key-value databases
///
/// Create one per process with [`KvdbManager::open`] and share the returned
/// `Arc`. Handlers keep a weak back-reference to it.
///
/// # Example
///
/// ```text
/// use kvdb_engine::KvdbManager;
///
/// let manager = KvdbManager::open("/var/lib/kvdb")?;
/// manager.create_db("geo")?;
///
/// let handler = manager.get_kvdb_handler("geo", "decoderA")?;
/// handler.set("10.0.0.1", json!({"country": "AR"}))?;
/// drop(handler); // releases the reference
///
/// manager.delete_db("geo")?;
/// ```
pub struct KvdbManager {
    /// Root directory (None for ephemeral managers)
    root: Option<PathBuf>,

    /// Creates, opens and destroys backing stores
    engine: Box<dyn StorageEngine>,

    /// Databases and scope reference table, always updated together
    registry: RwLock<Registry>,

    /// Set once by `finalize()` or drop; never cleared
    shutting_down: AtomicBool,

    config: ManagerConfig,
}

impl KvdbManager {
    /// Open a manager rooted at `path`
    ///
    /// Reads `kvdb.toml` from the root directory, creating it with defaults
    /// if missing.
    ///
    /// # Flow
    ///
    /// 1. Create the root directory if needed
    /// 2. Read or create `kvdb.toml`
    /// 3. Open a disk engine with the configured durability
    /// 4. Register databases already on disk as not loaded
    pub fn open<P: AsRef<Path>>(path: P) -> KvdbResult<Arc<Self>> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;

        let config_path = root.join(CONFIG_FILE_NAME);
        ManagerConfig::write_default_if_missing(&config_path)?;
        let cfg = ManagerConfig::from_file(&config_path)?;

        Self::open_with_config(root, cfg)
    }

    /// Open a manager rooted at `path` with an explicit configuration.
    ///
    /// The supplied config is written to `kvdb.toml` so that a later
    /// `KvdbManager::open()` on the same directory picks it up.
    pub fn open_with_config<P: AsRef<Path>>(path: P, cfg: ManagerConfig) -> KvdbResult<Arc<Self>> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;

        let durability = cfg.durability_mode()?;
        cfg.write_to_file(&root.join(CONFIG_FILE_NAME))?;

        let engine = DiskEngine::new(&root, durability)?;
        let manager = Self::build(Some(root), Box::new(engine), cfg)?;
        info!(
            target: "kvdb::manager",
            root = ?manager.root,
            durability = %durability,
            databases = manager.registry.read().names(false).len(),
            "KVDB manager opened"
        );
        Ok(manager)
    }

    /// Create a manager with no disk I/O
    ///
    /// Every database lives in memory and disappears with the manager.
    /// Use for tests.
    pub fn ephemeral() -> Arc<Self> {
        Arc::new(Self {
            root: None,
            engine: Box::new(MemoryEngine::new()),
            registry: RwLock::new(Registry::new()),
            shutting_down: AtomicBool::new(false),
            config: ManagerConfig {
                discover_existing: false,
                ..ManagerConfig::default()
            },
        })
    }

    /// Create a manager over a caller-supplied storage engine
    pub fn with_engine(engine: Box<dyn StorageEngine>, cfg: ManagerConfig) -> KvdbResult<Arc<Self>> {
        Self::build(None, engine, cfg)
    }

    fn build(
        root: Option<PathBuf>,
        engine: Box<dyn StorageEngine>,
        cfg: ManagerConfig,
    ) -> KvdbResult<Arc<Self>> {
        let mut registry = Registry::new();
        if cfg.discover_existing {
            for name in engine.discover()? {
                debug!(target: "kvdb::manager", db = %name, "Discovered database");
                registry.insert_unloaded(&name)?;
            }
        }

        Ok(Arc::new(Self {
            root,
            engine,
            registry: RwLock::new(registry),
            shutting_down: AtomicBool::new(false),
            config: cfg,
        }))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Root directory, None for ephemeral managers
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Active configuration
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Whether the manager is in shutdown mode.
    ///
    /// While shutting down, handlers do not unregister their references.
    pub fn manager_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Database lifecycle
    // ========================================================================

    /// Names of all registered databases, sorted
    ///
    /// With `loaded_only`, databases discovered on disk but not yet opened
    /// are left out.
    pub fn list_dbs(&self, loaded_only: bool) -> Vec<String> {
        self.registry.read().names(loaded_only)
    }

    /// Whether a database named `name` is registered
    pub fn exists_db(&self, name: &str) -> bool {
        self.registry.read().contains(name)
    }

    /// Total number of outstanding handlers for `name`
    pub fn db_ref_count(&self, name: &str) -> Option<u32> {
        self.registry.read().ref_count(name)
    }

    /// Create an empty database
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if the name is registered
    /// - `InvalidInput` if the name is not a valid database name
    pub fn create_db(&self, name: &str) -> KvdbResult<()> {
        validate_db_name(name)?;
        let mut registry = self.registry.write();
        if registry.contains(name) {
            return Err(Error::already_exists(name));
        }

        let store = self.engine.create(name)?;
        registry.insert_loaded(name, store)?;
        info!(target: "kvdb::manager", db = name, "Database created");
        Ok(())
    }

    /// Create a database pre-populated from the JSON object at `path`
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if the name is registered (checked before the file)
    /// - `ImportError` if the file cannot be read or is not a JSON object;
    ///   nothing is registered in that case
    pub fn load_db_from_file<P: AsRef<Path>>(&self, name: &str, path: P) -> KvdbResult<()> {
        let path = path.as_ref();
        validate_db_name(name)?;
        let mut registry = self.registry.write();
        if registry.contains(name) {
            return Err(Error::already_exists(name));
        }

        let store = match self.engine.import(name, path) {
            Ok(store) => store,
            Err(e) => {
                warn!(target: "kvdb::manager", db = name, path = ?path, error = %e, "Database import failed");
                return Err(e);
            }
        };
        let entries = store.len();
        registry.insert_loaded(name, store)?;
        info!(target: "kvdb::manager", db = name, path = ?path, entries, "Database loaded from file");
        Ok(())
    }

    /// Delete a database and its backing data
    ///
    /// # Errors
    ///
    /// - `NotFound` if the name is not registered
    /// - `InUse` (listing the holding scopes) while any handler is live
    pub fn delete_db(&self, name: &str) -> KvdbResult<()> {
        let mut registry = self.registry.write();
        let entry = registry.remove(name)?;

        // Release our reference to the store before its files go away
        drop(entry);

        if let Err(e) = self.engine.destroy(name) {
            // Keep the name visible so the caller can retry the deletion
            error!(target: "kvdb::manager", db = name, error = %e, "Failed to destroy database");
            if !matches!(e, Error::NotFound { .. }) {
                registry.insert_unloaded(name)?;
            }
            return Err(e);
        }
        info!(target: "kvdb::manager", db = name, "Database deleted");
        Ok(())
    }

    // ========================================================================
    // Handlers
    // ========================================================================

    /// Lease a handler for `db_name` on behalf of `scope_name`
    ///
    /// Every call yields an independent handler and one more reference on
    /// the `(db, scope)` pair. A database discovered on disk is opened on
    /// its first handler request.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the database is not registered; no edge is created
    pub fn get_kvdb_handler(
        self: &Arc<Self>,
        db_name: &str,
        scope_name: &str,
    ) -> KvdbResult<KvdbHandler> {
        let mut registry = self.registry.write();
        let entry = registry
            .get_mut(db_name)
            .ok_or_else(|| Error::not_found(db_name))?;

        let store = match entry.store.as_ref().map(Arc::clone) {
            Some(store) => store,
            None => {
                let store = self.engine.open(db_name)?;
                entry.store = Some(Arc::clone(&store));
                info!(target: "kvdb::manager", db = db_name, "Database loaded on first use");
                store
            }
        };

        registry.acquire(db_name, scope_name)?;
        debug!(
            target: "kvdb::manager",
            db = db_name,
            scope = scope_name,
            refs = registry.ref_count(db_name).unwrap_or(0),
            "Handler acquired"
        );
        #[cfg(test)]
        assert_eq!(registry.check_invariants(), Ok(()));
        drop(registry);

        Ok(KvdbHandler::new(
            Arc::downgrade(self),
            db_name.to_string(),
            scope_name.to_string(),
            store,
        ))
    }

    /// Give back one reference on `(db_name, scope_name)`
    ///
    /// Called by [`KvdbHandler`] on drop; every call must match an earlier
    /// successful [`get_kvdb_handler`](Self::get_kvdb_handler). A call with
    /// no matching reference is a bug: it is logged, panics in debug
    /// builds, and is otherwise ignored.
    ///
    /// No-op in shutdown mode.
    pub fn remove_kvdb_handler(&self, db_name: &str, scope_name: &str) {
        if self.manager_shutting_down() {
            debug!(
                target: "kvdb::manager",
                db = db_name,
                scope = scope_name,
                "Shutting down, handler release skipped"
            );
            return;
        }

        let mut registry = self.registry.write();
        match registry.release(db_name, scope_name) {
            Ok(()) => {
                debug!(
                    target: "kvdb::manager",
                    db = db_name,
                    scope = scope_name,
                    refs = registry.ref_count(db_name).unwrap_or(0),
                    "Handler released"
                );
                #[cfg(test)]
                assert_eq!(registry.check_invariants(), Ok(()));
            }
            Err(e) => {
                error!(
                    target: "kvdb::manager",
                    db = db_name,
                    scope = scope_name,
                    error = %e,
                    "Reference count invariant violated"
                );
                #[cfg(debug_assertions)]
                panic!("unbalanced handler release: {}", e);
            }
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// For every scope, the databases it holds handlers to and how many
    pub fn kvdb_scopes_info(&self) -> BTreeMap<String, RefInfo> {
        self.registry.read().scopes_info()
    }

    /// For every database, the scopes holding handlers to it and how many
    ///
    /// Unused databases appear with an empty map.
    pub fn kvdb_handlers_info(&self) -> BTreeMap<String, RefInfo> {
        self.registry.read().handlers_info()
    }

    // ========================================================================
    // Persistence & shutdown
    // ========================================================================

    /// Persist every loaded database
    ///
    /// Attempts all databases and returns the first error.
    pub fn flush(&self) -> KvdbResult<()> {
        // Held until every store is flushed and its Arc dropped: a store must
        // never write after delete_db has destroyed its directory.
        let registry = self.registry.read();
        let mut first_err = None;
        for (name, store) in registry.loaded_stores() {
            if let Err(e) = store.flush() {
                warn!(target: "kvdb::manager", db = %name, error = %e, "Failed to flush database");
                first_err.get_or_insert(e);
            }
        }
        drop(registry);

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Enter shutdown mode and persist every loaded database
    ///
    /// From here on handlers no longer unregister themselves. The
    /// transition is one-way; calling this again only flushes.
    pub fn finalize(&self) -> KvdbResult<()> {
        if !self.shutting_down.swap(true, Ordering::SeqCst) {
            info!(target: "kvdb::manager", "KVDB manager shutting down");
        }
        self.flush()
    }
}

impl Drop for KvdbManager {
    fn drop(&mut self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        if let Err(e) = self.flush() {
            warn!(target: "kvdb::manager", error = %e, "Flush on drop failed");
        }
    }
}

impl std::fmt::Debug for KvdbManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvdbManager")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("shutting_down", &self.manager_shutting_down())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
