//! Snapshot objects
//!
//! A snapshot is one immutable recorded state of a path. Snapshots form a
//! Merkle DAG: directories reference their children by hash, and every node
//! references the snapshot(s) it replaced through `parents`.

pub mod codec;
pub mod current;
pub mod export;
pub mod history;
pub mod merge;
pub mod resolve;

pub use current::{current, Snapshotter, SnapshotStats};
pub use export::export;
pub use history::{ancestors, History};
pub use merge::{merge, MergeOutcome, Merger};
pub use resolve::resolve;

use crate::types::Hash;
use std::collections::BTreeMap;

/// What a snapshot node records about its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKind {
    /// Regular file: stored content plus permission bits.
    Regular { contents: Hash, mode: u32 },
    /// Symbolic link: the stored object holds the link target.
    Symlink { target: Hash },
    /// Directory: child name to child snapshot hash, ordered by name.
    Directory { children: BTreeMap<String, Hash> },
    /// Unresolved merge of two entries. Each side is the snapshot hash of
    /// that side's entry, or `None` where the side deleted it.
    Conflict {
        base: Option<Hash>,
        ours: Option<Hash>,
        theirs: Option<Hash>,
    },
}

impl FileKind {
    pub fn name(&self) -> &'static str {
        match self {
            FileKind::Regular { .. } => "regular",
            FileKind::Symlink { .. } => "symlink",
            FileKind::Directory { .. } => "directory",
            FileKind::Conflict { .. } => "conflict",
        }
    }
}

/// Snapshot node of the Merkle DAG
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub kind: FileKind,
    /// Prior snapshots; the first is the primary line of history.
    pub parents: Vec<Hash>,
}

impl File {
    pub fn new(kind: FileKind, parents: Vec<Hash>) -> Self {
        Self { kind, parents }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, FileKind::Directory { .. })
    }

    pub fn children(&self) -> Option<&BTreeMap<String, Hash>> {
        match &self.kind {
            FileKind::Directory { children } => Some(children),
            _ => None,
        }
    }

    /// Whether two nodes record the same state, ignoring history.
    pub fn same_state(&self, other: &File) -> bool {
        self.kind == other.kind
    }

    /// Canonical serialization; see [`codec`].
    pub fn serialize(&self) -> String {
        codec::serialize(self)
    }

    pub fn parse(text: &str) -> Result<Self, crate::error::FormatError> {
        codec::parse(text)
    }
}

impl std::fmt::Display for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&codec::serialize(self))
    }
}
