//! KVDB manager engine
//!
//! This crate brokers shared, reference-counted access to named key-value
//! databases:
//! - KvdbManager: registry of databases, scope reference table, shutdown flag
//! - KvdbHandler: per-(database, scope) lease whose drop releases the reference
//! - ManagerConfig: `kvdb.toml` configuration
//!
//! The manager is the only component that knows which scopes hold which
//! databases; storage engines only turn names into stores.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod handler;
pub mod manager;

pub use handler::KvdbHandler;
pub use manager::{KvdbManager, ManagerConfig, CONFIG_FILE_NAME};
