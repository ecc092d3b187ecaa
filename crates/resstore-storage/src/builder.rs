//! Writer for the packed resource archive format

use crate::database::{index_codec, ArchiveHeader, ResourceEntry};
use crate::path::{normalize, NormalizedPath};
use crate::{FilesPolicy, ResourceFiles, Result, StorageError, StoreOptions};
use bincode::Options;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

enum Source {
    Bytes(Vec<u8>),
    File { path: PathBuf, len: u64 },
}

impl Source {
    fn len(&self) -> u64 {
        match self {
            Source::Bytes(bytes) => bytes.len() as u64,
            Source::File { len, .. } => *len,
        }
    }
}

/// Collects resources and writes them out as a single archive
///
/// Names are normalized on insertion; two names that normalize to the same
/// key are rejected. Output entries are sorted and packed back to back, so
/// any archive written here passes [`crate::ResourceDatabase::open`].
#[derive(Default)]
pub struct ArchiveBuilder {
    entries: BTreeMap<NormalizedPath, Source>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pack every loose file under `root`
    ///
    /// A top-level `res.pack` is skipped so that rebuilding an archive in
    /// place does not pack the previous archive into the new one.
    pub fn from_directory(root: impl AsRef<Path>) -> Result<Self> {
        let options = StoreOptions {
            files_policy: FilesPolicy::Cached,
            ..StoreOptions::default()
        };
        let files = ResourceFiles::build_with(root.as_ref(), &options, |_| {})?;

        let mut builder = Self::new();
        for name in files.iter() {
            builder.add_file(name.as_str(), name.to_native(files.root()))?;
        }
        Ok(builder)
    }

    fn insert(&mut self, name: &str, source: Source) -> Result<&mut Self> {
        let key = normalize(name);
        if key.is_empty() {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        if self.entries.contains_key(&key) {
            return Err(StorageError::DuplicateResource(key.to_string()));
        }
        self.entries.insert(key, source);
        Ok(self)
    }

    /// Add a resource from memory
    pub fn add(&mut self, name: &str, bytes: Vec<u8>) -> Result<&mut Self> {
        self.insert(name, Source::Bytes(bytes))
    }

    /// Add a resource whose bytes are copied from `path` at write time
    pub fn add_file(&mut self, name: &str, path: impl AsRef<Path>) -> Result<&mut Self> {
        let path = path.as_ref();
        let len = std::fs::metadata(path)
            .map_err(|e| StorageError::io(path, e))?
            .len();
        self.insert(
            name,
            Source::File {
                path: path.to_path_buf(),
                len,
            },
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the archive to `path`, returning the number of bytes written
    ///
    /// `path` is replaced only once the whole archive is on disk.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<u64> {
        let path = path.as_ref();

        let mut index = Vec::with_capacity(self.entries.len());
        let mut offset = 0u64;
        for (name, source) in &self.entries {
            let length = source.len();
            index.push(ResourceEntry {
                path: name.clone(),
                offset,
                length,
            });
            offset += length;
        }

        let index_bytes = index_codec()
            .serialize(&index)
            .map_err(|e| StorageError::CorruptIndex(e.to_string()))?;
        let header = ArchiveHeader {
            entry_count: index.len() as u64,
            index_len: index_bytes.len() as u64,
        };

        // Temp file must share the target's filesystem for the rename.
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;
        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            header
                .write(&mut out)
                .and_then(|_| out.write_all(&index_bytes))
                .map_err(|e| StorageError::io(path, e))?;

            for (name, source) in &self.entries {
                match source {
                    Source::Bytes(bytes) => {
                        out.write_all(bytes).map_err(|e| StorageError::io(path, e))?
                    }
                    Source::File { path: src, len } => copy_exact(src, *len, &mut out)?,
                }
                debug!(resource = %name, len = source.len(), "packed resource");
            }
            out.flush().map_err(|e| StorageError::io(path, e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| StorageError::io(tmp.path(), e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o644))
                .map_err(|e| StorageError::io(tmp.path(), e))?;
        }
        tmp.persist(path).map_err(|e| StorageError::io(path, e.error))?;

        let total = crate::database::HEADER_LEN + header.index_len + offset;
        debug!(
            archive = %path.display(),
            entries = index.len(),
            bytes = total,
            "wrote resource archive"
        );
        Ok(total)
    }
}

/// Copy a source file, failing if its size changed since it was added.
fn copy_exact(src: &Path, expected: u64, out: &mut impl Write) -> Result<()> {
    let file = File::open(src).map_err(|e| StorageError::io(src, e))?;
    let mut limited = io::Read::take(file, expected);
    let copied = io::copy(&mut limited, out).map_err(|e| StorageError::io(src, e))?;
    if copied != expected {
        return Err(StorageError::io(
            src,
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {} bytes, copied {}", expected, copied),
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ResourceDatabase, ResourceProvider};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_duplicate_after_normalization_rejected() {
        let mut builder = ArchiveBuilder::new();
        builder.add("img/cat.png", b"1".to_vec()).unwrap();
        assert!(matches!(
            builder.add("img\\cat.png", b"2".to_vec()),
            Err(StorageError::DuplicateResource(name)) if name == "img/cat.png"
        ));
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut builder = ArchiveBuilder::new();
        assert!(matches!(
            builder.add("/./", Vec::new()),
            Err(StorageError::InvalidName(_))
        ));
    }

    #[test]
    fn test_empty_archive() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("res.pack");
        let written = ArchiveBuilder::new().write_to(&archive).unwrap();
        assert_eq!(written, fs::metadata(&archive).unwrap().len());

        let db = ResourceDatabase::open(&archive).unwrap();
        assert!(db.is_empty());
        assert!(!db.have_file("anything"));
    }

    #[test]
    fn test_from_directory() {
        let src = tempdir().unwrap();
        fs::create_dir_all(src.path().join("img")).unwrap();
        fs::write(src.path().join("img").join("cat.png"), b"cat bytes").unwrap();
        fs::write(src.path().join("res.pack"), b"stale archive").unwrap();

        let builder = ArchiveBuilder::from_directory(src.path()).unwrap();
        assert_eq!(builder.len(), 1);

        let out = tempdir().unwrap();
        let archive = out.path().join("res.pack");
        builder.write_to(&archive).unwrap();

        let db = ResourceDatabase::open(&archive).unwrap();
        assert_eq!(db.read_file("img/cat.png").unwrap(), b"cat bytes");
        assert!(!db.have_file("res.pack"));
    }

    #[test]
    fn test_source_shrunk_before_write() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("shrinks.bin");
        fs::write(&src, b"0123456789").unwrap();

        let mut builder = ArchiveBuilder::new();
        builder.add_file("shrinks.bin", &src).unwrap();
        fs::write(&src, b"01").unwrap();

        assert!(matches!(
            builder.write_to(dir.path().join("res.pack")),
            Err(StorageError::Io { .. })
        ));
    }

    #[test]
    fn test_failed_rebuild_keeps_previous_archive() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("res.pack");
        let mut good = ArchiveBuilder::new();
        good.add("a.png", b"old a".to_vec()).unwrap();
        good.write_to(&archive).unwrap();

        let src = dir.path().join("shrinks.bin");
        fs::write(&src, b"0123456789").unwrap();
        let mut rebuild = ArchiveBuilder::new();
        rebuild.add("a.png", b"new a".to_vec()).unwrap();
        rebuild.add_file("shrinks.bin", &src).unwrap();
        fs::write(&src, b"01").unwrap();

        assert!(rebuild.write_to(&archive).is_err());

        let db = ResourceDatabase::open(&archive).unwrap();
        assert_eq!(db.len(), 1);
        assert_eq!(db.read_file("a.png").unwrap(), b"old a");

        let mut left: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        left.sort();
        assert_eq!(left, vec!["res.pack", "shrinks.bin"]);
    }

    #[test]
    fn test_failed_first_write_leaves_nothing() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("shrinks.bin");
        fs::write(&src, b"0123456789").unwrap();

        let mut builder = ArchiveBuilder::new();
        builder.add_file("shrinks.bin", &src).unwrap();
        fs::write(&src, b"01").unwrap();

        let archive = dir.path().join("res.pack");
        assert!(builder.write_to(&archive).is_err());
        assert!(!archive.exists());
    }
}
