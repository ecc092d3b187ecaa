//! resstore storage - Resource lookup for dictionary directories
//!
//! Dictionary entries reference auxiliary resources (images, sounds) by
//! file name. This crate answers whether such a resource exists and returns
//! its bytes, from either of two backends:
//! - Loose files under the dictionary directory
//! - A single packed archive (`res.pack`) built from such a tree
//!
//! ## Architecture
//!
//! - [`normalize`] canonicalizes resource names (`\` and `/` are equivalent)
//! - [`ResourceFiles`] scans a directory tree once
//! - [`ResourceDatabase`] parses an archive index; [`ArchiveBuilder`] writes one
//! - [`ResourceStore`] loads whatever a directory holds and answers
//!   [`ResourceProvider::have_file`] from both

mod builder;
mod database;
mod error;
mod files;
mod options;
mod path;
mod provider;
mod store;

pub use builder::ArchiveBuilder;
pub use database::{ResourceDatabase, ResourceEntry, ARCHIVE_MAGIC, ARCHIVE_VERSION, HEADER_LEN};
pub use error::{Result, StorageError};
pub use files::ResourceFiles;
pub use options::{FilesPolicy, StoreOptions, DEFAULT_ARCHIVE_NAME};
pub use path::{normalize, NormalizedPath, SEPARATOR};
pub use provider::{LoadPhase, Progress, ResourceProvider, StorageStats};
pub use store::{Backends, ResourceStore};
