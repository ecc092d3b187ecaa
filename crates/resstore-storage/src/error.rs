//! Error types for resource storage operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Archive truncated while reading {section}")]
    Truncated { section: &'static str },

    #[error("Corrupt archive index: {0}")]
    CorruptIndex(String),

    #[error("Unsupported archive version: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Not a resource archive (bad magic {found:?})")]
    BadMagic { found: [u8; 4] },

    #[error("Resource archive {path} is unusable: {source}")]
    ArchiveCorrupt {
        path: PathBuf,
        #[source]
        source: Box<StorageError>,
    },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid resource name: {0:?}")]
    InvalidName(String),

    #[error("Duplicate resource: {0}")]
    DuplicateResource(String),

    #[error("Invalid archive name {0:?}: must be a single file name")]
    InvalidArchiveName(String),

    #[error("Invalid storage options: {0}")]
    InvalidOptions(#[from] serde_json::Error),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors describing a malformed archive (as opposed to an
    /// environment failure such as a permission error).
    pub fn is_archive_defect(&self) -> bool {
        matches!(
            self,
            StorageError::Truncated { .. }
                | StorageError::CorruptIndex(_)
                | StorageError::VersionMismatch { .. }
                | StorageError::BadMagic { .. }
                | StorageError::ArchiveCorrupt { .. }
        )
    }
}
