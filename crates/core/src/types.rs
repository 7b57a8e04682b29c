//! Shared value types: reference snapshots and database names

use std::collections::BTreeMap;

use crate::error::{Error, KvdbResult};

/// Reference information for a scope or a database.
///
/// Maps a name (database or scope) to the number of outstanding handlers.
/// Ordered so that serialized reports are deterministic.
pub type RefInfo = BTreeMap<String, u32>;

/// Check that `name` is usable as a database identifier.
///
/// Names map one-to-one onto directories of the disk engine, so they must be
/// non-empty, must not contain path separators or NUL, and must not start
/// with a dot (which also rules out `.` and `..`).
pub fn validate_db_name(name: &str) -> KvdbResult<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput(
            "database name cannot be empty".to_string(),
        ));
    }
    if name.starts_with('.') {
        return Err(Error::InvalidInput(format!(
            "database name '{}' cannot start with '.'",
            name
        )));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(Error::InvalidInput(format!(
            "database name '{}' contains a path separator",
            name
        )));
    }
    Ok(())
}
