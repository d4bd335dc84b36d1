use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::digest::digest_copy;
use super::error::StorageError;
use super::handle::BlobHandle;
use super::staged::{StagedBlob, Staging};
use super::traits::{BlobStore, BoxReader};

/// In-process blob store for tests and ephemeral deployments.
#[derive(Clone)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<BlobHandle, Arc<[u8]>>>>,
    max_size: u64,
    chunk_size: usize,
}

impl MemoryBlobStore {
    pub fn new(max_size: u64, chunk_size: usize) -> Self {
        Self {
            blobs: Arc::default(),
            max_size,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Number of committed blobs, including orphans.
    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> StorageError {
        StorageError::Io(std::io::Error::other("memory blob store lock poisoned"))
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn stage(&self, mut reader: BoxReader<'_>) -> Result<StagedBlob, StorageError> {
        let mut data = Vec::new();
        let (hash, size) =
            digest_copy(&mut reader, &mut data, self.chunk_size, self.max_size).await?;
        Ok(StagedBlob::new(hash, size, Staging::Memory(data)))
    }

    async fn commit(&self, staged: StagedBlob) -> Result<BlobHandle, StorageError> {
        let Staging::Memory(data) = staged.staging else {
            return Err(StorageError::Io(std::io::Error::other(
                "staged blob was not produced by a memory store",
            )));
        };

        let handle = BlobHandle::generate();
        self.blobs
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(handle, data.into());
        Ok(handle)
    }

    async fn discard(&self, _staged: StagedBlob) -> Result<(), StorageError> {
        Ok(())
    }

    async fn get_stream(&self, handle: &BlobHandle) -> Result<BoxReader<'static>, StorageError> {
        let data = self
            .blobs
            .read()
            .map_err(|_| Self::poisoned())?
            .get(handle)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(handle.to_string()))?;
        Ok(Box::new(Cursor::new(data)))
    }

    async fn exists(&self, handle: &BlobHandle) -> Result<bool, StorageError> {
        Ok(self
            .blobs
            .read()
            .map_err(|_| Self::poisoned())?
            .contains_key(handle))
    }
}
