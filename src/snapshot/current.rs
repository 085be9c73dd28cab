//! Snapshot builder
//!
//! Walks a path, reuses cached results for leaves whose metadata proves them
//! unchanged, hashes everything else, and links each new node to the
//! snapshot it replaces. Unchanged state always maps back to the existing
//! node, so re-snapshotting an unchanged tree writes nothing and costs one
//! `lstat` per leaf.

use super::{File, FileKind};
use crate::cache::{ChangeDetector, EntryKind, MetadataCache, PathInfo};
use crate::cancel::Cancellation;
use crate::error::EngineError;
use crate::store::Storage;
use crate::tree::path::absolute_path;
use crate::tree::walker::list_children;
use crate::types::Hash;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, trace};

/// Counters for one snapshot run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotStats {
    /// Leaves whose content was read and hashed.
    pub files_hashed: u64,
    /// Leaves answered from the metadata cache.
    pub cache_hits: u64,
    /// New snapshot nodes stored.
    pub nodes_written: u64,
    /// Recomputed nodes that matched the previous snapshot.
    pub nodes_reused: u64,
    /// Excluded or unsupported entries.
    pub skipped: u64,
}

#[derive(Default)]
struct Counters {
    files_hashed: AtomicU64,
    cache_hits: AtomicU64,
    nodes_written: AtomicU64,
    nodes_reused: AtomicU64,
    skipped: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SnapshotStats {
        SnapshotStats {
            files_hashed: self.files_hashed.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            nodes_written: self.nodes_written.load(Ordering::Relaxed),
            nodes_reused: self.nodes_reused.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

/// Recursive snapshot builder over a [`Storage`]
pub struct Snapshotter<'a> {
    storage: &'a dyn Storage,
    detector: Arc<dyn ChangeDetector>,
    cancel: Cancellation,
    pool: Option<Arc<rayon::ThreadPool>>,
    counters: Counters,
}

impl<'a> Snapshotter<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self {
            storage,
            detector: Arc::new(MetadataCache::default()),
            cancel: Cancellation::new(),
            pool: None,
            counters: Counters::default(),
        }
    }

    /// Replace the change-detection policy.
    pub fn with_detector(mut self, detector: Arc<dyn ChangeDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run sibling snapshots on a dedicated pool of `threads` workers.
    pub fn with_threads(mut self, threads: usize) -> Result<Self, EngineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("strata-snapshot-{}", i))
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to build thread pool: {}", e)))?;
        self.pool = Some(Arc::new(pool));
        Ok(self)
    }

    pub fn stats(&self) -> SnapshotStats {
        self.counters.snapshot()
    }

    /// Snapshot `path`, returning its latest `(Hash, File)`.
    ///
    /// `path` is made absolute first; it is the key the index records.
    /// Returns `None` when the path is excluded or does not exist.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn snapshot(&self, path: &Path) -> Result<Option<(Hash, File)>, EngineError> {
        let start = Instant::now();
        let path = absolute_path(path)?;
        let result = match &self.pool {
            Some(pool) => pool.install(|| self.snapshot_path(&path)),
            None => self.snapshot_path(&path),
        }?;
        let stats = self.stats();
        info!(
            hash = %result.as_ref().map(|(h, _)| h.to_string()).unwrap_or_default(),
            files_hashed = stats.files_hashed,
            cache_hits = stats.cache_hits,
            nodes_written = stats.nodes_written,
            nodes_reused = stats.nodes_reused,
            skipped = stats.skipped,
            duration_ms = start.elapsed().as_millis() as u64,
            "Snapshot completed"
        );
        Ok(result)
    }

    fn snapshot_path(&self, path: &Path) -> Result<Option<(Hash, File)>, EngineError> {
        self.cancel.check()?;
        if self.storage.exclude(path) {
            trace!(path = %path.display(), "Excluded");
            Counters::bump(&self.counters.skipped);
            return Ok(None);
        }

        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(EngineError::io(path, e)),
        };
        let info = PathInfo::from_metadata(&metadata);

        match info.kind {
            EntryKind::Directory => self.snapshot_directory(path).map(Some),
            EntryKind::Regular | EntryKind::Symlink => self.snapshot_leaf(path, &info).map(Some),
            EntryKind::Other => {
                debug!(path = %path.display(), "Skipping unsupported file type");
                Counters::bump(&self.counters.skipped);
                Ok(None)
            }
        }
    }

    fn snapshot_leaf(&self, path: &Path, info: &PathInfo) -> Result<(Hash, File), EngineError> {
        if self.detector.unchanged(self.storage, path, info) {
            if let Some(prior) = self.storage.find_snapshot(path)? {
                trace!(path = %path.display(), "Cache hit");
                Counters::bump(&self.counters.cache_hits);
                return Ok(prior);
            }
        }

        let kind = match info.kind {
            EntryKind::Symlink => {
                let target = fs::read_link(path).map_err(|e| EngineError::io(path, e))?;
                let bytes = target.as_os_str().as_encoded_bytes();
                FileKind::Symlink {
                    target: self.storage.store_object(&mut &bytes[..])?,
                }
            }
            _ => {
                let bytes = fs::read(path).map_err(|e| EngineError::io(path, e))?;
                FileKind::Regular {
                    contents: self.storage.store_object(&mut bytes.as_slice())?,
                    mode: info.mode,
                }
            }
        };
        Counters::bump(&self.counters.files_hashed);

        let result = self.link(path, kind)?;
        self.detector.record(self.storage, path, info, &result.0)?;
        Ok(result)
    }

    fn snapshot_directory(&self, path: &Path) -> Result<(Hash, File), EngineError> {
        let entries = list_children(path)?;
        let snapshots = entries
            .par_iter()
            .map(|entry| {
                self.snapshot_path(&entry.path)
                    .map(|result| result.map(|(hash, _)| (entry.name.clone(), hash)))
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        let children: BTreeMap<String, Hash> = snapshots.into_iter().flatten().collect();
        self.link(path, FileKind::Directory { children })
    }

    /// Reuse the prior snapshot if it records `kind`, else store a successor of it.
    fn link(&self, path: &Path, kind: FileKind) -> Result<(Hash, File), EngineError> {
        let prior = self.storage.find_snapshot(path)?;
        if let Some((hash, file)) = prior.as_ref() {
            if file.kind == kind {
                Counters::bump(&self.counters.nodes_reused);
                return Ok((*hash, file.clone()));
            }
        }

        let parents = prior.map(|(hash, _)| vec![hash]).unwrap_or_default();
        let file = File::new(kind, parents);
        let hash = self.storage.store_snapshot(path, &file)?;
        debug!(path = %path.display(), hash = %hash, kind = file.kind.name(), "Stored snapshot");
        Counters::bump(&self.counters.nodes_written);
        Ok((hash, file))
    }
}

/// Snapshot `path` with the default metadata cache policy.
pub fn current(storage: &dyn Storage, path: &Path) -> Result<Option<(Hash, File)>, EngineError> {
    Snapshotter::new(storage).snapshot(path)
}
