//! KVDB - reference-counted manager for named key-value databases
//!
//! Many independent consumers ("scopes", e.g. detection rules or decoder
//! assets) share a set of on-disk key-value databases. The manager hands
//! each scope a handler per request, counts outstanding handlers per
//! (scope, database) pair, and refuses to delete a database while any
//! handler is live.
//!
//! # Quick Start
//!
//! ```ignore
//! use kvdb::{KvdbManager, json};
//!
//! let manager = KvdbManager::open("/var/lib/kvdb")?;
//! manager.load_db_from_file("geo", "/etc/kvdb/geo.json")?;
//!
//! let handler = manager.get_kvdb_handler("geo", "decoderA")?;
//! let country = handler.get("10.0.0.1")?;
//! drop(handler);
//!
//! manager.delete_db("geo")?;
//! ```
//!
//! # Architecture
//!
//! - [`kvdb_core`]: errors, `RefInfo`, the `KvStore` trait
//! - [`kvdb_storage`]: disk and memory engines, data file format, imports
//! - [`kvdb_engine`]: `KvdbManager` and `KvdbHandler`

pub use kvdb_core::{validate_db_name, Error, KvStore, KvdbResult, RefInfo};
pub use kvdb_engine::{KvdbHandler, KvdbManager, ManagerConfig, CONFIG_FILE_NAME};
pub use kvdb_storage::{DiskEngine, DurabilityMode, MemoryEngine, StorageEngine};
pub use serde_json::{json, Value};

pub use kvdb_core;
pub use kvdb_engine;
pub use kvdb_storage;
