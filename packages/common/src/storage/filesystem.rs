use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::BufReader;
use tracing::debug;

use super::digest::digest_copy;
use super::error::StorageError;
use super::handle::BlobHandle;
use super::staged::{StagedBlob, Staging, TempFileGuard};
use super::traits::{BlobStore, BoxReader};

/// Filesystem-backed blob store.
///
/// Committed blobs live in a sharded layout keyed by their handle:
/// `{base_path}/{first 2 chars}/{handle}`. Staging files live in
/// `{base_path}/.tmp` and become visible only through an atomic rename.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    max_size: u64,
    chunk_size: usize,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store.
    pub async fn new(
        base_path: PathBuf,
        max_size: u64,
        chunk_size: usize,
    ) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
            chunk_size: chunk_size.max(1),
        })
    }

    fn blob_path(&self, handle: &BlobHandle) -> PathBuf {
        self.base_path
            .join(handle.shard_prefix())
            .join(handle.to_string())
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn stage(&self, mut reader: BoxReader<'_>) -> Result<StagedBlob, StorageError> {
        let guard = TempFileGuard::new(self.temp_path());
        let mut temp_file = fs::File::create(guard.path()).await?;
        let (hash, size) =
            digest_copy(&mut reader, &mut temp_file, self.chunk_size, self.max_size).await?;

        temp_file.sync_all().await?;
        drop(temp_file);

        Ok(StagedBlob::new(hash, size, Staging::File(guard)))
    }

    async fn commit(&self, staged: StagedBlob) -> Result<BlobHandle, StorageError> {
        let (hash, size) = (staged.content_hash(), staged.size());
        let guard = match staged.staging {
            Staging::File(guard) => guard,
            Staging::Memory(_) => {
                return Err(StorageError::Io(std::io::Error::other(
                    "staged blob was not produced by a filesystem store",
                )));
            }
        };

        let handle = BlobHandle::generate();
        let blob_path = self.blob_path(&handle);

        let parent = blob_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| self.base_path.clone());
        fs::create_dir_all(&parent).await?;

        // The guard still owns the temp file if the rename fails.
        fs::rename(guard.path(), &blob_path).await?;
        guard.defuse();

        #[cfg(unix)]
        fs::File::open(&parent).await?.sync_all().await?;

        debug!(%handle, %hash, size, "Committed blob");
        Ok(handle)
    }

    async fn discard(&self, staged: StagedBlob) -> Result<(), StorageError> {
        if let Staging::File(guard) = staged.staging {
            let path = guard.defuse();
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn get_stream(&self, handle: &BlobHandle) -> Result<BoxReader<'static>, StorageError> {
        let blob_path = self.blob_path(handle);
        match fs::File::open(&blob_path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(handle.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, handle: &BlobHandle) -> Result<bool, StorageError> {
        let blob_path = self.blob_path(handle);
        Ok(fs::try_exists(&blob_path).await?)
    }
}
