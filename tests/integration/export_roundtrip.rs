//! Export materializes exactly the tree that was snapshotted

use std::fs;
use std::path::Path;
use std::sync::Arc;
use strata::cache::AlwaysRehash;
use strata::snapshot::{export, Snapshotter};
use strata::{EngineError, Hash, MemoryStorage};
use tempfile::TempDir;

/// Hash of `path` in a fresh store, where no history can influence it.
fn fresh_hash(path: &Path) -> Hash {
    Snapshotter::new(&MemoryStorage::new())
        .with_detector(Arc::new(AlwaysRehash))
        .snapshot(path)
        .unwrap()
        .unwrap()
        .0
}

#[test]
fn test_export_reproduces_tree_hash() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    fs::create_dir_all(source.join("docs").join("empty")).unwrap();
    fs::write(source.join("docs").join("guide.md"), "# Guide\n").unwrap();
    fs::write(source.join("data.bin"), [0u8, 159, 146, 150, 255]).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::write(source.join("run.sh"), "#!/bin/sh\necho hi\n").unwrap();
        fs::set_permissions(source.join("run.sh"), fs::Permissions::from_mode(0o755)).unwrap();
        std::os::unix::fs::symlink("docs/guide.md", source.join("guide")).unwrap();
    }

    let storage = MemoryStorage::new();
    let (hash, _) = strata::current(&storage, &source).unwrap().unwrap();

    let out = temp_dir.path().join("out");
    export(&storage, hash, &out).unwrap();
    assert_eq!(fresh_hash(&source), fresh_hash(&out));
    assert_eq!(fs::read(out.join("data.bin")).unwrap(), vec![0u8, 159, 146, 150, 255]);
    #[cfg(unix)]
    assert_eq!(
        fs::read_link(out.join("guide")).unwrap(),
        Path::new("docs/guide.md")
    );
}

#[test]
fn test_export_older_version_from_history() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("doc.txt");
    let storage = MemoryStorage::new();

    fs::write(&file, "version one").unwrap();
    let (v1, _) = strata::current(&storage, &file).unwrap().unwrap();
    fs::write(&file, "version two!").unwrap();
    let (v2, f2) = strata::current(&storage, &file).unwrap().unwrap();
    assert_eq!(f2.parents, vec![v1]);

    let out = temp_dir.path().join("restored.txt");
    export(&storage, v1, &out).unwrap();
    assert_eq!(fs::read_to_string(&out).unwrap(), "version one");

    assert!(matches!(
        export(&storage, v2, &out),
        Err(EngineError::DestinationExists(_))
    ));
    assert_eq!(fs::read_to_string(&out).unwrap(), "version one");
}

#[test]
fn test_export_unknown_hash_fails() {
    let temp_dir = TempDir::new().unwrap();
    let storage = MemoryStorage::new();
    let result = export(&storage, Hash::of(b"missing"), &temp_dir.path().join("out"));
    assert!(matches!(result, Err(EngineError::Storage(_))));
    assert!(!temp_dir.path().join("out").exists());
}
