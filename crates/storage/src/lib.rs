//! Storage layer for the KVDB manager
//!
//! This crate implements the backing stores that handlers read and write:
//! - FileStore: BTreeMap-based store with RwLock, persisted to `data.kvdb`
//! - MemoryStore: same contract, no disk I/O
//! - DiskEngine / MemoryEngine: name -> store factories behind `StorageEngine`
//! - Data file format with CRC32 integrity check
//! - JSON import files

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod data_file;
pub mod durability;
pub mod engine;
pub mod file_store;
pub mod import;
pub mod memory;

pub use durability::DurabilityMode;
pub use engine::{DiskEngine, MemoryEngine, StorageEngine};
pub use file_store::FileStore;
pub use import::read_import_file;
pub use memory::MemoryStore;
