//! Load-time options

use crate::path::normalize;
use crate::{Result, StorageError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name of the packed archive inside a dictionary directory
pub const DEFAULT_ARCHIVE_NAME: &str = "res.pack";

/// How the loose-file backend answers `have_file`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilesPolicy {
    /// Stat the file on every query. Short-circuits to `false` when the
    /// scan found nothing.
    #[default]
    Live,
    /// Answer from the set of paths seen during the scan.
    Cached,
}

/// Options for [`crate::ResourceStore::load_with`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreOptions {
    pub archive_name: String,
    pub files_policy: FilesPolicy,
    pub follow_symlinks: bool,
    pub scan_loose_files: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            files_policy: FilesPolicy::default(),
            follow_symlinks: true,
            scan_loose_files: true,
        }
    }
}

impl StoreOptions {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
        Self::from_json_str(&text)
    }

    /// Check that `archive_name` names a file directly inside the
    /// dictionary directory. Empty disables the archive.
    pub fn validate(&self) -> Result<()> {
        let name = &self.archive_name;
        if name.is_empty() || normalize(name).as_str() == name {
            Ok(())
        } else {
            Err(StorageError::InvalidArchiveName(name.clone()))
        }
    }
}
