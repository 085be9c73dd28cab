//! The hello/goodbye walkthrough: history links, idempotence and the cache contract

use super::test_utils::snapshot;
use std::fs;
use strata::cache::PathInfo;
use strata::{FileKind, MemoryStorage, Storage};
use tempfile::TempDir;

#[test]
fn test_hello_goodbye_history() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("greeting.txt");
    let storage = MemoryStorage::new();

    fs::write(&file, "Hello, World!").unwrap();
    let (h1, f1) = snapshot(&storage, &file);
    assert!(f1.parents.is_empty());

    fs::write(&file, "Goodbye, World!").unwrap();
    let (h3, f3) = snapshot(&storage, &file);
    assert_ne!(h3, h1);
    assert_eq!(f3.parents.first(), Some(&h1));

    // Unchanged: identical hash and identical serialized node.
    let (again, f_again) = snapshot(&storage, &file);
    assert_eq!(again, h3);
    assert_eq!(f_again.serialize(), f3.serialize());
}

#[test]
fn test_forced_metadata_match_returns_cached_hash() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("greeting.txt");
    let storage = MemoryStorage::new();

    fs::write(&file, "Goodbye, World!").unwrap();
    let (h3, _) = snapshot(&storage, &file);

    // Change the content, then make the cache claim the new metadata was
    // already hashed for the latest snapshot. The engine trusts it and never
    // rereads the file.
    fs::write(&file, "Goodbye, Moon!!").unwrap();
    let info = PathInfo::from_metadata(&fs::symlink_metadata(&file).unwrap());
    storage.cache_path_info(&file, &info, &h3).unwrap();

    let (cached, _) = snapshot(&storage, &file);
    if info.has_identity() {
        assert_eq!(cached, h3);
    } else {
        assert_ne!(cached, h3);
    }

    // Once the cache entry is gone the real content is picked up.
    storage.forget_path_info(&file).unwrap();
    let (fresh, fresh_file) = snapshot(&storage, &file);
    assert_ne!(fresh, h3);
    assert_eq!(fresh_file.parents, vec![h3]);
}

#[test]
fn test_reverted_content_maps_to_content_hash() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("notes.txt");
    let storage = MemoryStorage::new();

    fs::write(&file, "first draft").unwrap();
    let (h1, _) = snapshot(&storage, &file);
    fs::write(&file, "second draft, longer").unwrap();
    let (h2, _) = snapshot(&storage, &file);
    fs::write(&file, "first draft").unwrap();
    let (h3, f3) = snapshot(&storage, &file);

    // Same content as h1, but a successor of h2 rather than a copy of h1.
    assert_ne!(h3, h1);
    assert_eq!(f3.parents, vec![h2]);
    match f3.kind {
        FileKind::Regular { contents, .. } => {
            assert_eq!(storage.get_object(&contents).unwrap().unwrap(), b"first draft");
        }
        other => panic!("expected regular file, got {:?}", other),
    }

    // Rewriting identical bytes may move the mtime but must not add a node.
    let before = storage.object_count();
    fs::write(&file, "first draft").unwrap();
    let (h4, _) = snapshot(&storage, &file);
    assert_eq!(h4, h3);
    assert_eq!(storage.object_count(), before);
}
