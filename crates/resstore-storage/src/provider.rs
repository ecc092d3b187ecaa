//! Resource provider trait and load progress reporting

use crate::Result;
use std::fmt;

/// Read-only resource lookup interface
///
/// Implemented by each backend and by [`crate::ResourceStore`], which
/// combines them. Names are normalized by the implementation, so callers
/// may pass either separator convention.
pub trait ResourceProvider: Send + Sync {
    /// Whether a resource with this name exists. Never fails.
    fn have_file(&self, filename: &str) -> bool;

    /// Read the full contents of a resource
    fn read_file(&self, filename: &str) -> Result<Vec<u8>>;
}

/// Stage of [`crate::ResourceStore::load`] a progress report belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Parsing the packed archive index
    Archive,
    /// Walking the loose-file tree
    Scan,
}

/// Incremental load progress
///
/// `processed` counts units (archive entries, then scanned files) since the
/// start of the load and never decreases. `total` is `None` while the size
/// of the remaining work is unknown, which is always the case during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub phase: LoadPhase,
    pub processed: u64,
    pub total: Option<u64>,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.total {
            Some(total) => write!(f, "{:?}: {}/{}", self.phase, self.processed, total),
            None => write!(f, "{:?}: {}", self.phase, self.processed),
        }
    }
}

/// Counts of what a loaded store holds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub archive_entries: Option<usize>,
    pub loose_files: Option<usize>,
}

impl fmt::Display for StorageStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Resource Storage:")?;
        match self.archive_entries {
            Some(n) => writeln!(f, "  Archive entries: {}", n)?,
            None => writeln!(f, "  Archive entries: (no archive)")?,
        }
        match self.loose_files {
            Some(n) => writeln!(f, "  Loose files: {}", n)?,
            None => writeln!(f, "  Loose files: (not scanned)")?,
        }
        Ok(())
    }
}
