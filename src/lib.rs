//! Strata: recursive, content-addressed snapshots of filesystem trees
//!
//! Every file and directory state is stored as an immutable node in a Merkle
//! DAG keyed by its BLAKE3 hash. Nodes link to the state they replaced, so a
//! path's history is a walk over parent links, and two histories can be
//! merged against their nearest common ancestor.

pub mod cache;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod error;
pub mod ignore;
pub mod logging;
pub mod snapshot;
pub mod store;
pub mod tree;
pub mod types;

pub use error::{EngineError, FormatError, StorageError};
pub use snapshot::{current, export, merge, resolve, File, FileKind};
pub use store::{MemoryStorage, SledStorage, Storage};
pub use types::Hash;
