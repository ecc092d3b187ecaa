//! Packed-archive backend
//!
//! ## File layout
//!
//! All integers are little-endian.
//!
//! ```text
//! +--------------------------------------------------------------+
//! | header (24 bytes)                                            |
//! |   magic "SDRS" | version u32 | entry_count u64 | index_len u64 |
//! +--------------------------------------------------------------+
//! | index (index_len bytes)                                      |
//! |   bincode fixint Vec<ResourceEntry>, sorted by path          |
//! +--------------------------------------------------------------+
//! | blob                                                         |
//! |   resource bytes; entry offsets are relative to blob start   |
//! +--------------------------------------------------------------+
//! ```

use crate::path::{normalize, NormalizedPath};
use crate::{ResourceProvider, Result, StorageError};
use bincode::Options;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ARCHIVE_MAGIC: [u8; 4] = *b"SDRS";
pub const ARCHIVE_VERSION: u32 = 1;
pub const HEADER_LEN: u64 = 24;

/// Fixed-size archive header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ArchiveHeader {
    pub entry_count: u64,
    pub index_len: u64,
}

impl ArchiveHeader {
    pub(crate) fn write(&self, w: &mut impl Write) -> io::Result<()> {
        w.write_all(&ARCHIVE_MAGIC)?;
        w.write_u32::<LittleEndian>(ARCHIVE_VERSION)?;
        w.write_u64::<LittleEndian>(self.entry_count)?;
        w.write_u64::<LittleEndian>(self.index_len)?;
        Ok(())
    }

    fn read(r: &mut impl Read, path: &Path) -> Result<Self> {
        let on_err = |e: io::Error| read_error(path, "header", e);

        let mut magic = [0u8; 4];
        r.read_exact(&mut magic).map_err(on_err)?;
        if magic != ARCHIVE_MAGIC {
            return Err(StorageError::BadMagic { found: magic });
        }
        let version = r.read_u32::<LittleEndian>().map_err(on_err)?;
        if version != ARCHIVE_VERSION {
            return Err(StorageError::VersionMismatch {
                expected: ARCHIVE_VERSION,
                found: version,
            });
        }
        let entry_count = r.read_u64::<LittleEndian>().map_err(on_err)?;
        let index_len = r.read_u64::<LittleEndian>().map_err(on_err)?;

        Ok(Self {
            entry_count,
            index_len,
        })
    }
}

/// Encoding of the index section, shared by reader and writer.
pub(crate) fn index_codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

fn read_error(path: &Path, section: &'static str, e: io::Error) -> StorageError {
    match e.kind() {
        io::ErrorKind::UnexpectedEof => StorageError::Truncated { section },
        _ => StorageError::io(path, e),
    }
}

/// One resource in the archive index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    pub path: NormalizedPath,
    /// Offset from the start of the blob section
    pub offset: u64,
    pub length: u64,
}

impl ResourceEntry {
    fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.length)
    }
}

/// A parsed resource archive
///
/// The index is held in memory and never changes after [`ResourceDatabase::open`].
/// Resource bytes stay on disk; every read opens its own handle, so
/// concurrent readers need no locking.
#[derive(Debug)]
pub struct ResourceDatabase {
    path: PathBuf,
    blob_start: u64,
    entries: Vec<ResourceEntry>,
}

impl ResourceDatabase {
    /// Parse the header and index of the archive at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| StorageError::io(path, e))?;
        let file_len = file
            .metadata()
            .map_err(|e| StorageError::io(path, e))?
            .len();
        let mut reader = BufReader::new(file);

        let header = ArchiveHeader::read(&mut reader, path)?;

        let blob_start = HEADER_LEN
            .checked_add(header.index_len)
            .ok_or_else(|| StorageError::CorruptIndex("index length overflows".to_string()))?;
        if blob_start > file_len {
            return Err(StorageError::Truncated { section: "index" });
        }

        let index_len = usize::try_from(header.index_len)
            .map_err(|_| StorageError::CorruptIndex("index too large".to_string()))?;
        let mut index = vec![0u8; index_len];
        reader
            .read_exact(&mut index)
            .map_err(|e| read_error(path, "index", e))?;

        let entries: Vec<ResourceEntry> = index_codec()
            .deserialize(&index)
            .map_err(|e| StorageError::CorruptIndex(e.to_string()))?;

        validate(&entries, header.entry_count, file_len - blob_start)?;

        debug!(
            archive = %path.display(),
            entries = entries.len(),
            blob_len = file_len - blob_start,
            "opened resource archive"
        );

        Ok(Self {
            path: path.to_path_buf(),
            blob_start,
            entries,
        })
    }

    /// Look up an entry by exact normalized name
    pub fn get(&self, path: &NormalizedPath) -> Option<&ResourceEntry> {
        self.entries
            .binary_search_by(|e| e.path.as_str().cmp(path.as_str()))
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn contains(&self, path: &NormalizedPath) -> bool {
        self.get(path).is_some()
    }

    /// Read exactly the stored byte range of a resource
    pub fn read(&self, path: &NormalizedPath) -> Result<Vec<u8>> {
        let entry = self
            .get(path)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        let length = usize::try_from(entry.length)
            .map_err(|_| StorageError::CorruptIndex(format!("{} too large to read", path)))?;

        let mut file = File::open(&self.path).map_err(|e| StorageError::io(&self.path, e))?;
        file.seek(SeekFrom::Start(self.blob_start + entry.offset))
            .map_err(|e| StorageError::io(&self.path, e))?;
        let mut buf = vec![0u8; length];
        file.read_exact(&mut buf)
            .map_err(|e| read_error(&self.path, "blob", e))?;

        Ok(buf)
    }

    /// Entries in index (path) order
    pub fn entries(&self) -> impl Iterator<Item = &ResourceEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResourceProvider for ResourceDatabase {
    fn have_file(&self, filename: &str) -> bool {
        self.contains(&normalize(filename))
    }

    fn read_file(&self, filename: &str) -> Result<Vec<u8>> {
        self.read(&normalize(filename))
    }
}

/// Check index invariants: declared count, sorted unique normalized paths,
/// and in-bounds non-overlapping ranges.
fn validate(entries: &[ResourceEntry], entry_count: u64, blob_len: u64) -> Result<()> {
    if entries.len() as u64 != entry_count {
        return Err(StorageError::CorruptIndex(format!(
            "header declares {} entries, index holds {}",
            entry_count,
            entries.len()
        )));
    }

    for entry in entries {
        if entry.path.is_empty() || NormalizedPath::from_normalized(entry.path.as_str()).is_none() {
            return Err(StorageError::CorruptIndex(format!(
                "entry name {:?} is not normalized",
                entry.path.as_str()
            )));
        }
        match entry.end() {
            Some(end) if end <= blob_len => {}
            _ => {
                return Err(StorageError::CorruptIndex(format!(
                    "{} range {}+{} exceeds blob of {} bytes",
                    entry.path, entry.offset, entry.length, blob_len
                )))
            }
        }
    }

    for pair in entries.windows(2) {
        if pair[0].path.as_str() >= pair[1].path.as_str() {
            return Err(StorageError::CorruptIndex(format!(
                "entries out of order or duplicated at {}",
                pair[1].path
            )));
        }
    }

    let mut ranges: Vec<&ResourceEntry> = entries.iter().filter(|e| e.length > 0).collect();
    ranges.sort_by_key(|e| e.offset);
    for pair in ranges.windows(2) {
        if pair[0].offset + pair[0].length > pair[1].offset {
            return Err(StorageError::CorruptIndex(format!(
                "{} overlaps {}",
                pair[0].path, pair[1].path
            )));
        }
    }

    Ok(())
}
