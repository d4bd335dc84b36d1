use std::io::Cursor;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::handle::BlobHandle;
use super::staged::StagedBlob;

/// Type alias for a boxed async byte source.
pub type BoxReader<'a> = Box<dyn AsyncRead + Unpin + Send + 'a>;

/// Write-once blob storage addressed by generated handles.
///
/// Writes are two-phase: [`stage`](Self::stage) spools and digests the
/// source, [`commit`](Self::commit) publishes it atomically under a fresh
/// handle. A committed blob is never overwritten.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Spool `reader` into private staging space, hashing it on the way.
    ///
    /// The source is read exactly once. Source failures surface as
    /// [`StorageError::Read`], store failures as [`StorageError::Io`].
    async fn stage(&self, reader: BoxReader<'_>) -> Result<StagedBlob, StorageError>;

    /// Durably publish a staged blob and return its new handle.
    async fn commit(&self, staged: StagedBlob) -> Result<BlobHandle, StorageError>;

    /// Release a staged blob that will not be committed.
    async fn discard(&self, staged: StagedBlob) -> Result<(), StorageError>;

    /// Store data from an async reader and return its handle.
    async fn put_stream(&self, reader: BoxReader<'_>) -> Result<BlobHandle, StorageError> {
        let staged = self.stage(reader).await?;
        self.commit(staged).await
    }

    /// Store bytes and return their handle.
    async fn put(&self, data: &[u8]) -> Result<BlobHandle, StorageError> {
        let reader: BoxReader<'_> = Box::new(Cursor::new(data));
        self.put_stream(reader).await
    }

    /// Retrieve a blob as a streaming async reader.
    async fn get_stream(&self, handle: &BlobHandle) -> Result<BoxReader<'static>, StorageError>;

    /// Retrieve all bytes for a blob.
    async fn get(&self, handle: &BlobHandle) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(handle).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Check whether a committed blob exists.
    async fn exists(&self, handle: &BlobHandle) -> Result<bool, StorageError>;
}
