//! Durability modes for file-backed stores

use std::fmt;

/// Controls when a file-backed store writes its data file
///
/// | Mode | Behavior |
/// |------|----------|
/// | Standard | Rewrite on `flush()` and on drop, if anything changed |
/// | Always | Rewrite after every mutation |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// Persist on flush/drop (default)
    #[default]
    Standard,
    /// Persist after every write, zero data loss on crash
    Always,
}

impl DurabilityMode {
    /// Whether every mutation must reach disk before returning
    pub fn sync_on_write(&self) -> bool {
        matches!(self, DurabilityMode::Always)
    }

    /// Name used in `kvdb.toml`
    pub fn as_str(&self) -> &'static str {
        match self {
            DurabilityMode::Standard => "standard",
            DurabilityMode::Always => "always",
        }
    }
}

impl fmt::Display for DurabilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
