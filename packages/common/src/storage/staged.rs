use std::path::{Path, PathBuf};

use super::hash::ContentHash;

/// Bytes that have been spooled into a store and digested but are not yet
/// reachable through any [`BlobHandle`](super::BlobHandle).
///
/// Dropping a staged blob without committing or discarding it releases its
/// staging space, so an upload cancelled mid-flight leaves nothing behind.
pub struct StagedBlob {
    content_hash: ContentHash,
    size: u64,
    pub(crate) staging: Staging,
}

pub(crate) enum Staging {
    File(TempFileGuard),
    Memory(Vec<u8>),
}

impl StagedBlob {
    pub(crate) fn new(content_hash: ContentHash, size: u64, staging: Staging) -> Self {
        Self {
            content_hash,
            size,
            staging,
        }
    }

    pub fn content_hash(&self) -> ContentHash {
        self.content_hash
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl std::fmt::Debug for StagedBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedBlob")
            .field("content_hash", &self.content_hash)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Removes a staging file on drop unless it has been handed off.
pub(crate) struct TempFileGuard {
    path: PathBuf,
    defused: bool,
}

impl TempFileGuard {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path,
            defused: false,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Take ownership of the file; the caller is now responsible for it.
    pub(crate) fn defuse(mut self) -> PathBuf {
        self.defused = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if !self.defused {
            // Best effort.
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
