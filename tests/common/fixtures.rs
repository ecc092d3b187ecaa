use std::fs;
use std::path::{Path, PathBuf};

use resstore::storage::ArchiveBuilder;

/// A scratch dictionary directory
pub struct DictionaryDir {
    pub dir: tempfile::TempDir,
}

impl DictionaryDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a loose resource given a `/`-separated relative name
    pub fn loose(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = name
            .split('/')
            .fold(self.path().to_path_buf(), |p, segment| p.join(segment));
        fs::create_dir_all(path.parent().unwrap()).expect("Failed to create resource dir");
        fs::write(&path, bytes).expect(&format!("Failed to write resource: {}", name));
        path
    }

    /// Pack resources into `res.pack` at the directory root
    pub fn archive(&self, resources: &[(&str, &[u8])]) -> PathBuf {
        let mut builder = ArchiveBuilder::new();
        for (name, bytes) in resources {
            builder
                .add(name, bytes.to_vec())
                .expect(&format!("Failed to add resource: {}", name));
        }
        let path = self.path().join("res.pack");
        builder.write_to(&path).expect("Failed to write archive");
        path
    }
}
