//! Core types and traits for the KVDB manager
//!
//! This crate defines the foundational types shared by the storage and
//! engine layers:
//! - Error: Error taxonomy (AlreadyExists, NotFound, InUse, ImportError, ...)
//! - RefInfo: Name -> reference count snapshot used for reporting
//! - KvStore: Trait implemented by every backing key-value store
//! - Name validation for database identifiers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, KvdbResult};
pub use traits::KvStore;
pub use types::{validate_db_name, RefInfo};
