//! Error types for the KVDB manager
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! # Categories
//!
//! | Category | Variants | Retryable |
//! |----------|----------|-----------|
//! | Registry | `AlreadyExists`, `NotFound` | No |
//! | References | `InUse` | Yes, once holders release their handlers |
//! | Import | `ImportError` | No |
//! | System | `Io`, `Serialization`, `Corruption`, `InvalidInput`, `Internal` | No |

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for KVDB operations
pub type KvdbResult<T> = std::result::Result<T, Error>;

/// Error types for the KVDB manager
#[derive(Debug, Error)]
pub enum Error {
    /// A database with this name is already registered
    #[error("database '{name}' already exists")]
    AlreadyExists {
        /// Database name
        name: String,
    },

    /// The operation referenced an unregistered database
    #[error("database '{name}' not found")]
    NotFound {
        /// Database name
        name: String,
    },

    /// Deletion requested while scopes still hold handlers
    #[error("database '{name}' is in use by scopes: {}", .scopes.join(", "))]
    InUse {
        /// Database name
        name: String,
        /// Scopes currently holding at least one handler, sorted
        scopes: Vec<String>,
    },

    /// The import file could not be read or parsed
    #[error("failed to import '{}': {reason}", .path.display())]
    ImportError {
        /// Path of the import file
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// I/O error from the storage engine
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Data corruption detected in a data file
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Invalid argument (bad database name, empty path, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal invariant violation
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Short, stable name of the error kind for reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::AlreadyExists { .. } => "AlreadyExists",
            Error::NotFound { .. } => "NotFound",
            Error::InUse { .. } => "InUse",
            Error::ImportError { .. } => "ImportError",
            Error::Io(_) => "Io",
            Error::Serialization(_) => "Serialization",
            Error::Corruption(_) => "Corruption",
            Error::InvalidInput(_) => "InvalidInput",
            Error::Internal(_) => "Internal",
        }
    }

    /// Whether the same call may succeed later without changing its inputs.
    ///
    /// Only `InUse` qualifies: it clears once every holder releases.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::InUse { .. })
    }

    /// `AlreadyExists` for `name`
    pub fn already_exists(name: impl Into<String>) -> Self {
        Error::AlreadyExists { name: name.into() }
    }

    /// `NotFound` for `name`
    pub fn not_found(name: impl Into<String>) -> Self {
        Error::NotFound { name: name.into() }
    }

    /// Build an `ImportError` for `path`.
    pub fn import(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::ImportError {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
