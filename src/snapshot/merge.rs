//! Three-way merge of snapshot histories
//!
//! The merge base is the common ancestor nearest to both sides: the hash
//! reachable from both that minimizes the summed parent-link distance, then
//! the distance from `ours`, then the hash value. Trees are merged entry by
//! entry against that base. Entries both sides changed differently become
//! [`FileKind::Conflict`] nodes holding each side's snapshot hash, so a
//! conflicted result is still a complete, storable tree.

use super::history::distances;
use super::{File, FileKind};
use crate::cancel::Cancellation;
use crate::error::EngineError;
use crate::store::Storage;
use crate::types::Hash;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Result of merging two snapshots
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub hash: Hash,
    pub file: File,
    /// Merge base, absent when one side already contained the other.
    pub base: Option<Hash>,
    /// Paths, relative to the merged root, of every conflict node.
    pub conflicts: Vec<PathBuf>,
}

impl MergeOutcome {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

pub struct Merger<'a> {
    storage: &'a dyn Storage,
    cancel: Cancellation,
}

impl<'a> Merger<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self {
            storage,
            cancel: Cancellation::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    /// Nearest common ancestor of `ours` and `theirs`, if their histories meet.
    pub fn common_ancestor(&self, ours: Hash, theirs: Hash) -> Result<Option<Hash>, EngineError> {
        let from_ours = distances(self.storage, ours, &self.cancel)?;
        let from_theirs = distances(self.storage, theirs, &self.cancel)?;
        Ok(from_ours
            .iter()
            .filter_map(|(hash, d_ours)| {
                from_theirs
                    .get(hash)
                    .map(|d_theirs| (d_ours + d_theirs, *d_ours, *hash))
            })
            .min()
            .map(|(_, _, hash)| hash))
    }

    #[instrument(skip(self), fields(ours = %ours, theirs = %theirs))]
    pub fn merge(&self, ours: Hash, theirs: Hash) -> Result<MergeOutcome, EngineError> {
        if ours == theirs {
            return self.unchanged(ours, None);
        }
        let base = self
            .common_ancestor(ours, theirs)?
            .ok_or(EngineError::UnrelatedHistories { ours, theirs })?;
        debug!(base = %base, "Found merge base");
        if base == ours {
            return self.unchanged(theirs, None);
        }
        if base == theirs {
            return self.unchanged(ours, None);
        }

        let mut conflicts = Vec::new();
        let (mut hash, mut file) =
            self.merge_nodes(Some(base), ours, theirs, Path::new(""), &mut conflicts)?;
        if hash == ours || hash == theirs {
            // Record that both histories were combined.
            file = File::new(file.kind, vec![ours, theirs]);
            hash = self.storage.store_file(&file)?;
        }
        info!(hash = %hash, conflicts = conflicts.len(), "Merge completed");
        Ok(MergeOutcome {
            hash,
            file,
            base: Some(base),
            conflicts,
        })
    }

    fn unchanged(&self, hash: Hash, base: Option<Hash>) -> Result<MergeOutcome, EngineError> {
        Ok(MergeOutcome {
            hash,
            file: self.storage.read_snapshot(&hash)?,
            base,
            conflicts: Vec::new(),
        })
    }

    fn merge_nodes(
        &self,
        base: Option<Hash>,
        ours: Hash,
        theirs: Hash,
        at: &Path,
        conflicts: &mut Vec<PathBuf>,
    ) -> Result<(Hash, File), EngineError> {
        self.cancel.check()?;
        if ours == theirs {
            return Ok((ours, self.storage.read_snapshot(&ours)?));
        }

        let our_file = self.storage.read_snapshot(&ours)?;
        let their_file = self.storage.read_snapshot(&theirs)?;
        if our_file.children().is_some() != their_file.children().is_some() {
            // A file on one side and a directory on the other never merges.
            return self.conflict(base, Some(ours), Some(theirs), at, conflicts);
        }
        if base == Some(theirs) {
            return Ok((ours, our_file));
        }
        if base == Some(ours) {
            return Ok((theirs, their_file));
        }
        let base_file = base.map(|b| self.storage.read_snapshot(&b)).transpose()?;

        if let (Some(our_children), Some(their_children)) =
            (our_file.children(), their_file.children())
        {
            let empty = BTreeMap::new();
            let base_children = base_file
                .as_ref()
                .and_then(|b| b.children())
                .unwrap_or(&empty);
            let names: BTreeSet<&String> = our_children
                .keys()
                .chain(their_children.keys())
                .collect();

            let mut children = BTreeMap::new();
            for name in names {
                let merged = self.merge_entry(
                    base_children.get(name).copied(),
                    our_children.get(name).copied(),
                    their_children.get(name).copied(),
                    &at.join(name),
                    conflicts,
                )?;
                if let Some(hash) = merged {
                    children.insert(name.clone(), hash);
                }
            }
            let file = File::new(FileKind::Directory { children }, vec![ours, theirs]);
            let hash = self.storage.store_file(&file)?;
            return Ok((hash, file));
        }

        if our_file.same_state(&their_file) {
            return Ok((ours, our_file));
        }
        if let Some(base_file) = &base_file {
            if base_file.same_state(&our_file) {
                return Ok((theirs, their_file));
            }
            if base_file.same_state(&their_file) {
                return Ok((ours, our_file));
            }
        }
        self.conflict(base, Some(ours), Some(theirs), at, conflicts)
    }

    /// Merge one directory entry that may be missing on either side.
    fn merge_entry(
        &self,
        base: Option<Hash>,
        ours: Option<Hash>,
        theirs: Option<Hash>,
        at: &Path,
        conflicts: &mut Vec<PathBuf>,
    ) -> Result<Option<Hash>, EngineError> {
        match (ours, theirs) {
            (None, None) => Ok(None),
            (Some(ours), Some(theirs)) => {
                Ok(Some(self.merge_nodes(base, ours, theirs, at, conflicts)?.0))
            }
            (Some(kept), None) | (None, Some(kept)) => {
                let Some(base) = base else {
                    // Added on one side only.
                    return Ok(Some(kept));
                };
                if self.unmodified(base, kept)? {
                    // Deleted on one side, untouched on the other.
                    return Ok(None);
                }
                let (ours, theirs) = if ours.is_some() {
                    (Some(kept), None)
                } else {
                    (None, Some(kept))
                };
                Ok(Some(self.conflict(Some(base), ours, theirs, at, conflicts)?.0))
            }
        }
    }

    fn unmodified(&self, base: Hash, side: Hash) -> Result<bool, EngineError> {
        if base == side {
            return Ok(true);
        }
        let base_file = self.storage.read_snapshot(&base)?;
        let side_file = self.storage.read_snapshot(&side)?;
        Ok(base_file.same_state(&side_file))
    }

    fn conflict(
        &self,
        base: Option<Hash>,
        ours: Option<Hash>,
        theirs: Option<Hash>,
        at: &Path,
        conflicts: &mut Vec<PathBuf>,
    ) -> Result<(Hash, File), EngineError> {
        debug!(path = %at.display(), "Conflict");
        conflicts.push(at.to_path_buf());
        let parents = ours.into_iter().chain(theirs).collect();
        let file = File::new(FileKind::Conflict { base, ours, theirs }, parents);
        let hash = self.storage.store_file(&file)?;
        Ok((hash, file))
    }
}

/// Merge `ours` and `theirs` into a single snapshot.
pub fn merge(storage: &dyn Storage, ours: Hash, theirs: Hash) -> Result<MergeOutcome, EngineError> {
    Merger::new(storage).merge(ours, theirs)
}
