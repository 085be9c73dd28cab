//! Merging divergent histories recorded from a real directory

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strata::cache::AlwaysRehash;
use strata::snapshot::{export, merge, Snapshotter};
use strata::tree::path::absolute_path;
use strata::{EngineError, FileKind, Hash, MemoryStorage, Storage};
use tempfile::TempDir;

fn snap(storage: &dyn Storage, path: &Path) -> Hash {
    Snapshotter::new(storage)
        .with_detector(Arc::new(AlwaysRehash))
        .snapshot(path)
        .unwrap()
        .unwrap()
        .0
}

/// Point the index for `path` and everything below it back at `hash`.
fn rewind(storage: &dyn Storage, hash: Hash, path: &Path) {
    storage.set_latest(path, &hash).unwrap();
    let file = storage.read_snapshot(&hash).unwrap();
    if let Some(children) = file.children() {
        for (name, child) in children {
            rewind(storage, *child, &path.join(name));
        }
    }
}

struct Fixture {
    temp_dir: TempDir,
    dir: PathBuf,
    storage: MemoryStorage,
    base: Hash,
}

impl Fixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let dir = absolute_path(&temp_dir.path().join("work")).unwrap();
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("a.txt"), "a0").unwrap();
        fs::write(dir.join("b.txt"), "b0").unwrap();
        let storage = MemoryStorage::new();
        let base = snap(&storage, &dir);
        Self {
            temp_dir: temp_dir,
            dir,
            storage,
            base,
        }
    }

    /// Restore the base contents on disk and in the index, then apply `edit`.
    fn branch(&self, edit: impl FnOnce(&Path)) -> Hash {
        rewind(&self.storage, self.base, &self.dir);
        fs::write(self.dir.join("a.txt"), "a0").unwrap();
        fs::write(self.dir.join("b.txt"), "b0").unwrap();
        edit(&self.dir);
        snap(&self.storage, &self.dir)
    }
}

#[test]
fn test_disjoint_edits_merge_cleanly() {
    let fx = Fixture::new();
    let ours = fx.branch(|d| fs::write(d.join("a.txt"), "a1").unwrap());
    let theirs = fx.branch(|d| fs::write(d.join("b.txt"), "b1").unwrap());
    assert_eq!(fx.storage.read_snapshot(&theirs).unwrap().parents, vec![fx.base]);

    let outcome = merge(&fx.storage, ours, theirs).unwrap();
    assert!(outcome.is_clean());
    assert_eq!(outcome.base, Some(fx.base));
    assert_eq!(outcome.file.parents, vec![ours, theirs]);
    // Merging never moves the path index.
    assert_eq!(fx.storage.latest(&fx.dir).unwrap(), Some(theirs));

    let out = fx.temp_dir.path().join("merged");
    export(&fx.storage, outcome.hash, &out).unwrap();
    assert_eq!(fs::read_to_string(out.join("a.txt")).unwrap(), "a1");
    assert_eq!(fs::read_to_string(out.join("b.txt")).unwrap(), "b1");
}

#[test]
fn test_concurrent_edit_conflicts_and_exports_markers() {
    let fx = Fixture::new();
    let ours = fx.branch(|d| fs::write(d.join("a.txt"), "ours\n").unwrap());
    let theirs = fx.branch(|d| fs::write(d.join("a.txt"), "theirs\n").unwrap());

    let outcome = merge(&fx.storage, ours, theirs).unwrap();
    assert_eq!(outcome.conflicts, vec![PathBuf::from("a.txt")]);

    let merged = outcome.file.children().unwrap();
    let conflict = fx.storage.read_snapshot(&merged["a.txt"]).unwrap();
    match conflict.kind {
        FileKind::Conflict { base, ours, theirs } => {
            assert!(base.is_some() && ours.is_some() && theirs.is_some());
        }
        other => panic!("expected conflict, got {:?}", other),
    }

    let out = fx.temp_dir.path().join("merged");
    export(&fx.storage, outcome.hash, &out).unwrap();
    assert_eq!(
        fs::read_to_string(out.join("a.txt")).unwrap(),
        "<<<<<<< ours\nours\n=======\ntheirs\n>>>>>>> theirs\n"
    );
    assert_eq!(fs::read_to_string(out.join("b.txt")).unwrap(), "b0");
}

#[test]
fn test_delete_against_edit_conflicts() {
    let fx = Fixture::new();
    let ours = fx.branch(|d| fs::remove_file(d.join("b.txt")).unwrap());
    let theirs = fx.branch(|d| fs::write(d.join("b.txt"), "b1").unwrap());

    let outcome = merge(&fx.storage, ours, theirs).unwrap();
    assert_eq!(outcome.conflicts, vec![PathBuf::from("b.txt")]);

    let out = fx.temp_dir.path().join("merged");
    export(&fx.storage, outcome.hash, &out).unwrap();
    assert!(!out.join("b.txt").exists());
    assert_eq!(fs::read_to_string(out.join("b.txt.theirs")).unwrap(), "b1");
}

#[test]
fn test_delete_against_untouched_removes_entry() {
    let fx = Fixture::new();
    let ours = fx.branch(|d| fs::remove_file(d.join("b.txt")).unwrap());
    let theirs = fx.branch(|d| fs::write(d.join("c.txt"), "new").unwrap());

    let outcome = merge(&fx.storage, ours, theirs).unwrap();
    assert!(outcome.is_clean());
    let names: Vec<&String> = outcome.file.children().unwrap().keys().collect();
    assert_eq!(names, vec!["a.txt", "c.txt"]);
}

#[test]
fn test_linear_history_fast_forwards() {
    let fx = Fixture::new();
    fs::write(fx.dir.join("a.txt"), "a1").unwrap();
    let newer = snap(&fx.storage, &fx.dir);

    let outcome = merge(&fx.storage, fx.base, newer).unwrap();
    assert_eq!(outcome.hash, newer);
    let outcome = merge(&fx.storage, newer, fx.base).unwrap();
    assert_eq!(outcome.hash, newer);
    let outcome = merge(&fx.storage, newer, newer).unwrap();
    assert_eq!(outcome.hash, newer);
}

#[test]
fn test_separate_paths_are_unrelated() {
    let fx = Fixture::new();
    let other = fx.temp_dir.path().join("other");
    fs::create_dir(&other).unwrap();
    fs::write(other.join("z.txt"), "z").unwrap();
    let unrelated = snap(&fx.storage, &other);

    assert!(matches!(
        merge(&fx.storage, fx.base, unrelated),
        Err(EngineError::UnrelatedHistories { .. })
    ));
}
