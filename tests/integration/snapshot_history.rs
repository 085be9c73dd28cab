//! Snapshot builder and history walker over real directory trees

use super::test_utils::snapshot;
use std::fs;
use std::sync::Arc;
use strata::cache::AlwaysRehash;
use strata::cancel::Cancellation;
use strata::snapshot::{ancestors, Snapshotter};
use strata::{EngineError, FileKind, Hash, MemoryStorage, Storage};
use tempfile::TempDir;

fn build_tree(root: &std::path::Path) {
    fs::create_dir_all(root.join("src").join("nested")).unwrap();
    fs::write(root.join("README"), "readme").unwrap();
    fs::write(root.join("src").join("lib.rs"), "pub fn a() {}").unwrap();
    fs::write(root.join("src").join("nested").join("deep.rs"), "deep").unwrap();
}

#[test]
fn test_nested_change_propagates_to_root() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("project");
    build_tree(&root);
    let storage = MemoryStorage::new();

    let (r1, d1) = snapshot(&storage, &root);
    let src1 = d1.children().unwrap()["src"];
    let readme1 = d1.children().unwrap()["README"];

    fs::write(root.join("src").join("nested").join("deep.rs"), "deeper").unwrap();
    let (r2, d2) = snapshot(&storage, &root);

    assert_ne!(r1, r2);
    assert_eq!(d2.parents, vec![r1]);
    let children = d2.children().unwrap();
    assert_ne!(children["src"], src1);
    // Untouched siblings keep their identity.
    assert_eq!(children["README"], readme1);

    let src2 = storage.read_snapshot(&children["src"]).unwrap();
    assert_eq!(src2.parents, vec![src1]);
}

#[test]
fn test_cache_and_rehash_policies_agree() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("project");
    build_tree(&root);

    let cached_store = MemoryStorage::new();
    let rehash_store = MemoryStorage::new();
    for round in 0..3 {
        fs::write(root.join("src").join("round.txt"), "r".repeat(round + 1)).unwrap();
        let (cached, _) = snapshot(&cached_store, &root);
        let (rehashed, _) = Snapshotter::new(&rehash_store)
            .with_detector(Arc::new(AlwaysRehash))
            .snapshot(&root)
            .unwrap()
            .unwrap();
        assert_eq!(cached, rehashed, "round {}", round);
    }
}

#[test]
fn test_thread_pool_gives_same_hash() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("wide");
    fs::create_dir(&root).unwrap();
    for i in 0..64 {
        fs::write(root.join(format!("file-{:02}", i)), format!("content {}", i)).unwrap();
    }

    let serial = Snapshotter::new(&MemoryStorage::new())
        .with_threads(1)
        .unwrap()
        .snapshot(&root)
        .unwrap()
        .unwrap()
        .0;
    let parallel = Snapshotter::new(&MemoryStorage::new())
        .with_threads(8)
        .unwrap()
        .snapshot(&root)
        .unwrap()
        .unwrap()
        .0;
    assert_eq!(serial, parallel);
}

#[cfg(unix)]
#[test]
fn test_unreadable_child_aborts_directory() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("project");
    build_tree(&root);
    let locked = root.join("src").join("nested");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(&locked).is_ok() {
        // Running as root: permissions are not enforced.
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let storage = MemoryStorage::new();
    let result = Snapshotter::new(&storage)
        .with_detector(Arc::new(AlwaysRehash))
        .snapshot(&root);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(matches!(result, Err(EngineError::Io { .. })));
    assert!(storage.find_snapshot(&root).unwrap().is_none());
    assert!(storage.find_snapshot(&root.join("src")).unwrap().is_none());
}

#[test]
fn test_history_walks_every_version_once() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("log.txt");
    let storage = MemoryStorage::new();

    let mut hashes = Vec::new();
    for i in 0..4 {
        fs::write(&file, "x".repeat(i + 1)).unwrap();
        hashes.push(snapshot(&storage, &file).0);
    }
    hashes.reverse();

    let walked: Vec<Hash> = ancestors(&storage, hashes[0])
        .map(|entry| entry.map(|(hash, _)| hash))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(walked, hashes);

    let limited: Vec<_> = ancestors(&storage, hashes[0]).take(2).collect();
    assert_eq!(limited.len(), 2);
}

#[test]
fn test_timeout_cancels_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    build_tree(temp_dir.path());
    let storage = MemoryStorage::new();

    let result = Snapshotter::new(&storage)
        .with_cancellation(Cancellation::with_timeout(std::time::Duration::ZERO))
        .snapshot(temp_dir.path());
    assert!(matches!(result, Err(EngineError::Cancelled)));
    assert_eq!(storage.object_count(), 0);
}

#[test]
fn test_empty_directory_and_empty_file() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("sparse");
    fs::create_dir_all(root.join("empty-dir")).unwrap();
    fs::write(root.join("empty-file"), "").unwrap();
    let storage = MemoryStorage::new();

    let (_, dir) = snapshot(&storage, &root);
    let children = dir.children().unwrap();
    let empty_dir = storage.read_snapshot(&children["empty-dir"]).unwrap();
    assert!(matches!(empty_dir.kind, FileKind::Directory { ref children } if children.is_empty()));
    let empty_file = storage.read_snapshot(&children["empty-file"]).unwrap();
    assert!(matches!(empty_file.kind, FileKind::Regular { contents, .. } if contents == Hash::of(b"")));
}
