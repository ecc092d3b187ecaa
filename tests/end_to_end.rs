//! End-to-end tests through the root crate's re-exports
//!
//! These follow a dictionary's resources from a loose tree, to a packed
//! archive, to an archive shipped alongside later loose additions.

mod common;

use common::fixtures::DictionaryDir;
use resstore::storage::{ArchiveBuilder, StorageError};
use resstore::{normalize, ResourceProvider, ResourceStore};
use std::fs;

#[test]
fn e2e_pack_loose_tree_then_serve_from_archive() {
    let source = DictionaryDir::new();
    source.loose("img/cat.png", b"cat");
    source.loose("snd/bark.ogg", b"bark");
    source.loose("snd/animals/cow.ogg", b"moo");

    let loose = ResourceStore::load(source.path(), |_| {}).expect("loose load failed");
    assert_eq!(loose.backends().name(), "files");

    // Ship a dictionary with only the packed archive.
    let shipped = DictionaryDir::new();
    ArchiveBuilder::from_directory(source.path())
        .expect("collect failed")
        .write_to(shipped.path().join("res.pack"))
        .expect("pack failed");

    let packed = ResourceStore::load(shipped.path(), |_| {}).expect("packed load failed");
    assert_eq!(packed.stats().archive_entries, Some(3));
    assert_eq!(packed.stats().loose_files, Some(0));

    for name in [
        "img/cat.png",
        "img\\cat.png",
        "snd/animals/cow.ogg",
        "snd\\animals/cow.ogg",
    ] {
        assert!(packed.have_file(name), "missing {}", name);
        assert_eq!(loose.have_file(name), packed.have_file(name), "disagree on {}", name);
        assert_eq!(
            loose.read_file(name).unwrap(),
            packed.read_file(name).unwrap(),
            "bytes differ for {}",
            name
        );
    }
    assert!(!packed.have_file("img/dog.png"));
}

#[test]
fn e2e_archive_with_late_loose_additions() {
    let dict = DictionaryDir::new();
    dict.archive(&[("a.png", b"a from archive")]);
    dict.loose("b.png", b"b added later");

    let store = ResourceStore::load(dict.path(), |_| {}).unwrap();

    assert!(store.have_file("a.png"));
    assert!(store.have_file("b.png"));
    assert_eq!(store.read_file("a.png").unwrap(), b"a from archive");
    assert_eq!(store.read_file("b.png").unwrap(), b"b added later");
}

#[test]
fn e2e_corrupt_archive_is_reported_not_hidden() {
    let dict = DictionaryDir::new();
    let archive = dict.archive(&[("a.png", b"a"), ("b.png", b"b")]);
    dict.loose("c.png", b"c");

    let mut bytes = fs::read(&archive).unwrap();
    bytes[4] = 9; // low byte of the version field
    fs::write(&archive, &bytes).unwrap();

    match ResourceStore::load(dict.path(), |_| {}) {
        Err(StorageError::ArchiveCorrupt { source, .. }) => assert!(matches!(
            *source,
            StorageError::VersionMismatch { found: 9, .. }
        )),
        other => panic!("expected ArchiveCorrupt, got {:?}", other.map(|s| s.stats())),
    }
}

#[test]
fn e2e_store_as_trait_object() {
    let dict = DictionaryDir::new();
    dict.loose("img/cat.png", b"cat");

    let store = ResourceStore::load(dict.path(), |_| {}).unwrap();
    let providers: Vec<Box<dyn ResourceProvider>> = vec![Box::new(store)];

    let wanted = normalize("img\\cat.png");
    assert!(providers.iter().any(|p| p.have_file(wanted.as_str())));
}
