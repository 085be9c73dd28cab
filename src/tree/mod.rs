//! Filesystem access helpers
//!
//! Path normalization for the path index and directory enumeration for the
//! snapshot builder.

pub mod path;
pub mod walker;
