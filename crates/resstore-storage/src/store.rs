//! Resource storage facade combining the archive and loose-file backends

use crate::path::normalize;
use crate::{
    LoadPhase, Progress, ResourceDatabase, ResourceFiles, ResourceProvider, Result,
    StorageError, StorageStats, StoreOptions,
};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Which backends a loaded store holds
#[derive(Debug)]
pub enum Backends {
    None,
    FilesOnly(ResourceFiles),
    DatabaseOnly(ResourceDatabase),
    Both {
        database: ResourceDatabase,
        files: ResourceFiles,
    },
}

impl Backends {
    fn new(database: Option<ResourceDatabase>, files: Option<ResourceFiles>) -> Self {
        match (database, files) {
            (None, None) => Backends::None,
            (None, Some(files)) => Backends::FilesOnly(files),
            (Some(database), None) => Backends::DatabaseOnly(database),
            (Some(database), Some(files)) => Backends::Both { database, files },
        }
    }

    pub fn database(&self) -> Option<&ResourceDatabase> {
        match self {
            Backends::DatabaseOnly(database) | Backends::Both { database, .. } => Some(database),
            _ => None,
        }
    }

    pub fn files(&self) -> Option<&ResourceFiles> {
        match self {
            Backends::FilesOnly(files) | Backends::Both { files, .. } => Some(files),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backends::None => "none",
            Backends::FilesOnly(_) => "files",
            Backends::DatabaseOnly(_) => "database",
            Backends::Both { .. } => "database+files",
        }
    }
}

/// Resources for one dictionary directory
///
/// Built by [`ResourceStore::load`]; there is no way to load into an
/// existing store. Immutable afterwards, so queries may run from any
/// number of threads.
#[derive(Debug)]
pub struct ResourceStore {
    root: PathBuf,
    backends: Backends,
}

impl ResourceStore {
    /// Load the resources of `dirname` with default options
    pub fn load(dirname: impl AsRef<Path>, progress: impl FnMut(Progress)) -> Result<Self> {
        Self::load_with(dirname, &StoreOptions::default(), progress)
    }

    /// Load the resources of `dirname`
    ///
    /// If `dirname` contains the archive file it is parsed first; a present
    /// but malformed archive fails the whole load with
    /// [`StorageError::ArchiveCorrupt`], loose files notwithstanding. The
    /// directory is then scanned for loose files.
    pub fn load_with(
        dirname: impl AsRef<Path>,
        options: &StoreOptions,
        mut progress: impl FnMut(Progress),
    ) -> Result<Self> {
        let root = dirname.as_ref();
        if !root.is_dir() {
            return Err(StorageError::NotADirectory(root.to_path_buf()));
        }
        options.validate()?;

        let mut processed = 0u64;

        let archive_path = root.join(&options.archive_name);
        let database = if !options.archive_name.is_empty() && archive_path.is_file() {
            let database = ResourceDatabase::open(&archive_path).map_err(|e| {
                if e.is_archive_defect() {
                    StorageError::ArchiveCorrupt {
                        path: archive_path.clone(),
                        source: Box::new(e),
                    }
                } else {
                    e
                }
            })?;
            processed = database.len() as u64;
            progress(Progress {
                phase: LoadPhase::Archive,
                processed,
                total: Some(processed),
            });
            Some(database)
        } else {
            None
        };

        let files = if options.scan_loose_files {
            let base = processed;
            let files = ResourceFiles::build_with(root, options, |n| {
                progress(Progress {
                    phase: LoadPhase::Scan,
                    processed: base + n,
                    total: None,
                })
            })?;
            Some(files)
        } else {
            None
        };

        let backends = Backends::new(database, files);
        debug!(
            root = %root.display(),
            backends = backends.name(),
            "loaded resource storage"
        );

        Ok(Self {
            root: root.to_path_buf(),
            backends,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    pub fn stats(&self) -> StorageStats {
        StorageStats {
            archive_entries: self.backends.database().map(ResourceDatabase::len),
            loose_files: self.backends.files().map(ResourceFiles::len),
        }
    }
}

impl ResourceProvider for ResourceStore {
    fn have_file(&self, filename: &str) -> bool {
        let path = normalize(filename);
        match &self.backends {
            Backends::None => false,
            Backends::FilesOnly(files) => files.contains(&path),
            Backends::DatabaseOnly(database) => database.contains(&path),
            Backends::Both { database, files } => database.contains(&path) || files.contains(&path),
        }
    }

    /// Archive contents take precedence over a loose file of the same name.
    fn read_file(&self, filename: &str) -> Result<Vec<u8>> {
        let path = normalize(filename);
        if let Some(database) = self.backends.database() {
            if database.contains(&path) {
                return database.read(&path);
            }
        }
        if let Some(files) = self.backends.files() {
            return files.read(&path);
        }
        Err(StorageError::NotFound(path.to_string()))
    }
}
