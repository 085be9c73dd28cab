//! History traversal over the parent links of the snapshot DAG.

use super::File;
use crate::cancel::Cancellation;
use crate::error::EngineError;
use crate::store::Storage;
use crate::types::Hash;
use std::collections::{HashMap, HashSet, VecDeque};

/// Lazy breadth-first walk from a snapshot through its parents
///
/// Each hash is yielded once even when merges make the history re-converge.
/// Parents are visited in order, so the primary line comes first at every
/// depth.
pub struct History<'a> {
    storage: &'a dyn Storage,
    cancel: Cancellation,
    queue: VecDeque<Hash>,
    seen: HashSet<Hash>,
}

impl<'a> History<'a> {
    pub fn new(storage: &'a dyn Storage, start: Hash) -> Self {
        Self {
            storage,
            cancel: Cancellation::new(),
            queue: VecDeque::from([start]),
            seen: HashSet::from([start]),
        }
    }

    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }
}

impl Iterator for History<'_> {
    type Item = Result<(Hash, File), EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.queue.pop_front()?;
        let file = match self
            .cancel
            .check()
            .and_then(|()| self.storage.read_snapshot(&hash))
        {
            Ok(file) => file,
            Err(e) => {
                // A broken link or a cancellation ends the walk.
                self.queue.clear();
                return Some(Err(e));
            }
        };
        for parent in &file.parents {
            if self.seen.insert(*parent) {
                self.queue.push_back(*parent);
            }
        }
        Some(Ok((hash, file)))
    }
}

pub fn ancestors(storage: &dyn Storage, start: Hash) -> History<'_> {
    History::new(storage, start)
}

/// Distance in parent links from `start` to every snapshot in its history.
pub fn distances(
    storage: &dyn Storage,
    start: Hash,
    cancel: &Cancellation,
) -> Result<HashMap<Hash, usize>, EngineError> {
    let mut distances = HashMap::from([(start, 0usize)]);
    let mut queue = VecDeque::from([start]);
    while let Some(hash) = queue.pop_front() {
        cancel.check()?;
        let depth = distances[&hash];
        for parent in storage.read_snapshot(&hash)?.parents {
            if !distances.contains_key(&parent) {
                distances.insert(parent, depth + 1);
                queue.push_back(parent);
            }
        }
    }
    Ok(distances)
}
