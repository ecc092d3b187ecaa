//! Loose-file backend: resources stored as plain files under a directory

use crate::path::{normalize, NormalizedPath};
use crate::{FilesPolicy, ResourceProvider, Result, StorageError, StoreOptions};
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Resources found by recursively scanning a directory
///
/// The scan runs once, in [`ResourceFiles::build`]. Queries either consult
/// the scanned set or stat the file again, depending on [`FilesPolicy`].
#[derive(Debug)]
pub struct ResourceFiles {
    root: PathBuf,
    files: BTreeSet<NormalizedPath>,
    policy: FilesPolicy,
    follow_symlinks: bool,
    excluded: Option<NormalizedPath>,
}

impl ResourceFiles {
    /// Scan `root` with default options
    pub fn build(root: impl AsRef<Path>) -> Result<Self> {
        Self::build_with(root, &StoreOptions::default(), |_| {})
    }

    /// Scan `root`, calling `on_file` with the running count of files seen.
    ///
    /// A top-level file named `options.archive_name` is the packed archive,
    /// not a resource, and is left out.
    pub fn build_with(
        root: impl AsRef<Path>,
        options: &StoreOptions,
        mut on_file: impl FnMut(u64),
    ) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(StorageError::NotADirectory(root.to_path_buf()));
        }
        options.validate()?;

        let excluded = Some(normalize(&options.archive_name)).filter(|p| !p.is_empty());
        let mut files = BTreeSet::new();
        let mut seen = 0u64;

        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(options.follow_symlinks);

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    if let Some(ancestor) = err.loop_ancestor() {
                        warn!(
                            path = ?err.path(),
                            ancestor = %ancestor.display(),
                            "skipping symlink loop"
                        );
                        continue;
                    }
                    if err.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound) {
                        warn!(path = ?err.path(), "skipping dangling entry");
                        continue;
                    }
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.to_path_buf());
                    let source = err
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "directory walk failed"));
                    return Err(StorageError::io(path, source));
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let rel = match entry.path().strip_prefix(root) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            let key = match NormalizedPath::from_relative(rel) {
                Some(key) => key,
                None => {
                    warn!(path = ?entry.path(), "skipping file with non-UTF-8 name");
                    continue;
                }
            };
            if entry.depth() == 1 && excluded.as_ref() == Some(&key) {
                continue;
            }

            trace!(resource = %key, "found loose file");
            files.insert(key);
            seen += 1;
            on_file(seen);
        }

        debug!(
            root = %root.display(),
            count = files.len(),
            policy = ?options.files_policy,
            "scanned loose resource files"
        );

        Ok(Self {
            root: root.to_path_buf(),
            files,
            policy: options.files_policy,
            follow_symlinks: options.follow_symlinks,
            excluded,
        })
    }

    /// Check a normalized name against this backend
    pub fn contains(&self, path: &NormalizedPath) -> bool {
        if path.is_empty() || self.excluded.as_ref() == Some(path) {
            return false;
        }
        match self.policy {
            FilesPolicy::Cached => self.files.contains(path),
            FilesPolicy::Live => {
                !self.files.is_empty()
                    && (self.follow_symlinks || !self.crosses_symlink(path))
                    && path.to_native(&self.root).is_file()
            }
        }
    }

    /// Whether any component of `path` below the root is a symbolic link.
    /// A component that cannot be inspected counts as one.
    fn crosses_symlink(&self, path: &NormalizedPath) -> bool {
        let mut current = self.root.clone();
        for segment in path.segments() {
            current.push(segment);
            match std::fs::symlink_metadata(&current) {
                Ok(meta) if meta.file_type().is_symlink() => return true,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => return false,
                Err(_) => return true,
            }
        }
        false
    }

    /// Read a loose file's bytes
    pub fn read(&self, path: &NormalizedPath) -> Result<Vec<u8>> {
        if !self.contains(path) {
            return Err(StorageError::NotFound(path.to_string()));
        }
        let native = path.to_native(&self.root);
        std::fs::read(&native).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            _ => StorageError::io(native, e),
        })
    }

    /// Root directory this backend was scanned from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Paths seen during the scan, in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &NormalizedPath> {
        self.files.iter()
    }

    /// Number of files seen during the scan
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn policy(&self) -> FilesPolicy {
        self.policy
    }
}

impl ResourceProvider for ResourceFiles {
    fn have_file(&self, filename: &str) -> bool {
        self.contains(&normalize(filename))
    }

    fn read_file(&self, filename: &str) -> Result<Vec<u8>> {
        self.read(&normalize(filename))
    }
}
