//! resstore - Resource storage for dictionary directories
//!
//! This is the root workspace crate that provides end-to-end tests.
//! The implementation lives in the workspace member crates.

// Re-export the storage crate for convenience
pub use resstore_storage as storage;
pub use resstore_storage::{normalize, ResourceProvider, ResourceStore};
