//! `kvdb.toml`: settings read once when a manager opens its root directory
//!
//! A missing file is created with commented defaults. Edits take effect on
//! the next open.

use kvdb_core::{Error, KvdbResult};
use kvdb_storage::DurabilityMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the settings file inside the manager root.
pub const CONFIG_FILE_NAME: &str = "kvdb.toml";

/// Settings for a disk-backed manager
///
/// ```toml
/// durability = "standard"
/// discover_existing = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// `"standard"` flushes on demand and at shutdown, `"always"` on every write
    #[serde(default = "default_durability_str")]
    pub durability: String,
    /// Register databases found under the root directory on open.
    #[serde(default = "default_discover")]
    pub discover_existing: bool,
}

fn default_durability_str() -> String {
    DurabilityMode::Standard.as_str().to_string()
}

fn default_discover() -> bool {
    true
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            durability: default_durability_str(),
            discover_existing: default_discover(),
        }
    }
}

fn file_error(action: &str, path: &Path, e: impl std::fmt::Display) -> Error {
    Error::Internal(format!("cannot {} {}: {}", action, path.display(), e))
}

impl ManagerConfig {
    /// The configured [`DurabilityMode`]; unknown names are `InvalidInput`.
    pub fn durability_mode(&self) -> KvdbResult<DurabilityMode> {
        match self.durability.as_str() {
            "standard" => Ok(DurabilityMode::Standard),
            "always" => Ok(DurabilityMode::Always),
            other => Err(Error::InvalidInput(format!(
                "unknown durability '{}' in {} (use \"standard\" or \"always\")",
                other, CONFIG_FILE_NAME
            ))),
        }
    }

    /// Text written to a fresh `kvdb.toml`
    pub fn default_toml() -> &'static str {
        r#"# KVDB manager settings
#
# durability: when database files are rewritten
#   "standard" (default): on flush and on shutdown
#   "always":             after every write
durability = "standard"

# Register databases already present under this directory on startup.
# They are listed as not loaded until a handler is requested.
discover_existing = true
"#
    }

    /// Load settings from `path`, rejecting an unknown durability up front.
    pub fn from_file(path: &Path) -> KvdbResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| file_error("read", path, e))?;
        let config: ManagerConfig = toml::from_str(&text).map_err(|e| {
            Error::InvalidInput(format!("malformed {}: {}", path.display(), e))
        })?;
        config.durability_mode()?;
        Ok(config)
    }

    /// Create `path` with [`default_toml`](Self::default_toml) unless it exists.
    pub fn write_default_if_missing(path: &Path) -> KvdbResult<()> {
        if path.exists() {
            return Ok(());
        }
        std::fs::write(path, Self::default_toml()).map_err(|e| file_error("write", path, e))
    }

    /// Persist these settings to `path`, replacing its contents.
    pub fn write_to_file(&self, path: &Path) -> KvdbResult<()> {
        let text = toml::to_string_pretty(self).map_err(|e| file_error("encode", path, e))?;
        std::fs::write(path, text).map_err(|e| file_error("write", path, e))
    }
}
