//! Core identity types shared across the crate.

use crate::error::FormatError;
use std::fmt;
use std::str::FromStr;

/// Prefix naming the digest algorithm in the textual form of a [`Hash`].
pub const HASH_ALGORITHM: &str = "blake3";

/// BLAKE3 digest identifying a stored object.
///
/// The canonical textual form is `blake3:<64 lowercase hex digits>`. Both the
/// object store and every snapshot reference use it, so it must never change.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; 32]);

impl Hash {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hash an in-memory byte sequence.
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Hex digest without the algorithm prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Abbreviated form for human-facing output.
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", HASH_ALGORITHM, self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self)
    }
}

impl FromStr for Hash {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FormatError::InvalidHash(s.to_string());
        let (algorithm, digest) = s.split_once(':').ok_or_else(invalid)?;
        if algorithm != HASH_ALGORITHM || digest.len() != 64 {
            return Err(invalid());
        }
        // Uppercase hex would parse but break the one-text-per-hash rule.
        if digest.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(invalid());
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digest, &mut bytes).map_err(|_| invalid())?;
        Ok(Self(bytes))
    }
}
