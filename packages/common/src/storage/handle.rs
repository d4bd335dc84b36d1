use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use super::error::StorageError;

/// Opaque retrieval handle for a committed blob.
///
/// Handles are generated by the store on every commit and never derived from
/// caller input, so two writes of identical bytes still get distinct handles.
/// Only canonical UUID strings parse, which keeps a handle from naming any
/// location outside the store.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobHandle(Uuid);

impl BlobHandle {
    /// Allocate a fresh handle.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a handle previously rendered with `Display`.
    pub fn parse(s: &str) -> Result<Self, StorageError> {
        let uuid = Uuid::try_parse(s)
            .map_err(|e| StorageError::InvalidHandle(format!("{s:?}: {e}")))?;
        // Only the hyphenated lowercase form round-trips.
        if uuid.hyphenated().to_string() != s {
            return Err(StorageError::InvalidHandle(format!(
                "{s:?} is not in canonical form"
            )));
        }
        Ok(Self(uuid))
    }

    /// First two characters, used to shard on-disk layouts.
    pub fn shard_prefix(&self) -> String {
        self.to_string()[..2].to_string()
    }
}

impl FromStr for BlobHandle {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobHandle({})", self.0.hyphenated())
    }
}

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}
