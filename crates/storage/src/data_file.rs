//! Data file format
//!
//! Each database persists its full contents to a single `data.kvdb` file.
//! The file is rewritten as a whole on flush (write to temp, fsync, rename),
//! so there is no log to replay.
//!
//! # Format
//!
//! ```text
//! +------------------+
//! | Magic: "KVDB"    | 4 bytes
//! | Format Version   | 4 bytes (u32 LE)
//! | Entry Count      | 8 bytes (u64 LE)
//! | Entries          | variable
//! |   Key Length     |   4 bytes (u32 LE)
//! |   Key            |   UTF-8 bytes
//! |   Value Length   |   4 bytes (u32 LE)
//! |   Value          |   JSON bytes
//! | CRC32            | 4 bytes
//! +------------------+
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

/// Data file magic bytes: "KVDB" (0x4B564442)
pub const DATA_MAGIC: [u8; 4] = *b"KVDB";

/// Current data file format version
pub const DATA_FORMAT_VERSION: u32 = 1;

/// Name of the data file inside a database directory
pub const DATA_FILE_NAME: &str = "data.kvdb";

/// magic(4) + version(4) + count(8) + crc(4)
const MIN_FILE_LEN: usize = 20;

/// Errors decoding a data file
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataFileError {
    /// Fewer bytes than the fixed header and trailer
    #[error("data file too short")]
    TooShort,

    /// Magic bytes do not match
    #[error("invalid data file magic")]
    InvalidMagic,

    /// Written by a newer format
    #[error("unsupported data file version {0}")]
    UnsupportedVersion(u32),

    /// Stored checksum differs from computed checksum
    #[error("checksum mismatch: expected {expected:08x}, computed {computed:08x}")]
    ChecksumMismatch {
        /// CRC stored in the file
        expected: u32,
        /// CRC computed over the file contents
        computed: u32,
    },

    /// Entry count promises more bytes than the file holds
    #[error("data file truncated at entry {0}")]
    Truncated(u64),

    /// Bytes left over after the last counted entry
    #[error("{0} unexpected bytes after the last entry")]
    TrailingBytes(usize),

    /// Key is not UTF-8 or value is not valid JSON
    #[error("invalid entry {index}: {reason}")]
    InvalidEntry {
        /// Entry position
        index: u64,
        /// Decode failure
        reason: String,
    },
}

impl From<DataFileError> for kvdb_core::Error {
    fn from(e: DataFileError) -> Self {
        kvdb_core::Error::Corruption(e.to_string())
    }
}

/// Serialize database entries to bytes
pub fn encode(entries: &BTreeMap<String, Value>) -> kvdb_core::KvdbResult<Vec<u8>> {
    let mut bytes = Vec::new();

    bytes.extend_from_slice(&DATA_MAGIC);
    bytes.extend_from_slice(&DATA_FORMAT_VERSION.to_le_bytes());
    let count = u64::try_from(entries.len())
        .map_err(|_| kvdb_core::Error::InvalidInput("too many entries".to_string()))?;
    bytes.extend_from_slice(&count.to_le_bytes());

    for (key, value) in entries {
        let value_bytes = serde_json::to_vec(value)?;
        bytes.extend_from_slice(&length_prefix(key.len(), key)?);
        bytes.extend_from_slice(key.as_bytes());
        bytes.extend_from_slice(&length_prefix(value_bytes.len(), key)?);
        bytes.extend_from_slice(&value_bytes);
    }

    // CRC32 of all preceding bytes
    let crc = crc32fast::hash(&bytes);
    bytes.extend_from_slice(&crc.to_le_bytes());

    Ok(bytes)
}

/// u32 LE length of a key or value belonging to `key`
fn length_prefix(len: usize, key: &str) -> kvdb_core::KvdbResult<[u8; 4]> {
    let len = u32::try_from(len).map_err(|_| {
        kvdb_core::Error::InvalidInput(format!(
            "entry '{}' exceeds the {} byte field limit",
            key,
            u32::MAX
        ))
    })?;
    Ok(len.to_le_bytes())
}

/// Deserialize database entries from bytes
pub fn decode(bytes: &[u8]) -> Result<BTreeMap<String, Value>, DataFileError> {
    if bytes.len() < MIN_FILE_LEN {
        return Err(DataFileError::TooShort);
    }

    if bytes[0..4] != DATA_MAGIC {
        return Err(DataFileError::InvalidMagic);
    }

    let (data, crc_bytes) = bytes.split_at(bytes.len() - 4);
    let stored_crc = read_u32(crc_bytes, 0).ok_or(DataFileError::TooShort)?;
    let computed_crc = crc32fast::hash(data);
    if stored_crc != computed_crc {
        return Err(DataFileError::ChecksumMismatch {
            expected: stored_crc,
            computed: computed_crc,
        });
    }

    let version = read_u32(data, 4).ok_or(DataFileError::TooShort)?;
    if version > DATA_FORMAT_VERSION {
        return Err(DataFileError::UnsupportedVersion(version));
    }

    let count = read_u64(data, 8).ok_or(DataFileError::TooShort)?;
    let mut cursor = 16;
    let mut entries = BTreeMap::new();

    for index in 0..count {
        let key_bytes = read_chunk(data, &mut cursor).ok_or(DataFileError::Truncated(index))?;
        let key = std::str::from_utf8(key_bytes)
            .map_err(|e| DataFileError::InvalidEntry {
                index,
                reason: e.to_string(),
            })?
            .to_string();
        let value_bytes = read_chunk(data, &mut cursor).ok_or(DataFileError::Truncated(index))?;
        let value: Value =
            serde_json::from_slice(value_bytes).map_err(|e| DataFileError::InvalidEntry {
                index,
                reason: e.to_string(),
            })?;
        entries.insert(key, value);
    }

    if cursor != data.len() {
        return Err(DataFileError::TrailingBytes(data.len() - cursor));
    }

    Ok(entries)
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let raw = bytes.get(at..at + 4)?;
    Some(u32::from_le_bytes(raw.try_into().ok()?))
}

fn read_u64(bytes: &[u8], at: usize) -> Option<u64> {
    let raw = bytes.get(at..at + 8)?;
    Some(u64::from_le_bytes(raw.try_into().ok()?))
}

/// Read a u32-length-prefixed chunk and advance the cursor
fn read_chunk<'a>(bytes: &'a [u8], cursor: &mut usize) -> Option<&'a [u8]> {
    let len = read_u32(bytes, *cursor)? as usize;
    let start = *cursor + 4;
    let chunk = bytes.get(start..start.checked_add(len)?)?;
    *cursor = start + len;
    Some(chunk)
}

/// Write entries to `path` atomically
///
/// Writes to a sibling temp file, fsyncs it, then renames over `path`.
pub fn write_file(path: &Path, entries: &BTreeMap<String, Value>) -> kvdb_core::KvdbResult<()> {
    let bytes = encode(entries)?;
    let tmp_path = path.with_extension("kvdb.tmp");

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp_path)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;

    // Make the rename durable
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}

/// Read entries from `path`
pub fn read_file(path: &Path) -> kvdb_core::KvdbResult<BTreeMap<String, Value>> {
    let bytes = fs::read(path)?;
    Ok(decode(&bytes)?)
}
