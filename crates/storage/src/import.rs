//! Import files
//!
//! An import file is a JSON document whose top level is an object; each
//! member becomes one entry of the new database:
//!
//! ```json
//! { "10.0.0.1": { "country": "AR" }, "10.0.0.2": { "country": "UY" } }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use kvdb_core::{Error, KvdbResult};
use serde_json::Value;

/// Read and parse an import file
///
/// Every failure (missing file, unreadable file, invalid JSON, non-object
/// top level) is reported as `Error::ImportError`.
pub fn read_import_file(path: &Path) -> KvdbResult<BTreeMap<String, Value>> {
    if path.as_os_str().is_empty() {
        return Err(Error::import(path, "import path is empty"));
    }

    let content = std::fs::read_to_string(path).map_err(|e| Error::import(path, e.to_string()))?;
    let document: Value =
        serde_json::from_str(&content).map_err(|e| Error::import(path, e.to_string()))?;

    match document {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(Error::import(
            path,
            format!("expected a JSON object at top level, found {}", json_type(&other)),
        )),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
