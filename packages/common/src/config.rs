use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::storage::filesystem::FilesystemBlobStore;
use crate::storage::memory::MemoryBlobStore;
use crate::storage::{BlobStore, DEFAULT_CHUNK_SIZE, StorageError};

/// Which blob store implementation to run.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Filesystem,
    Memory,
}

/// Blob storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Backend selection. Default: filesystem.
    #[serde(default)]
    pub backend: StorageBackend,
    /// Root directory for the filesystem backend. Default: "./data/blobs".
    #[serde(default = "default_blob_dir")]
    pub blob_dir: PathBuf,
    /// Largest accepted upload in bytes. Default: 128 MiB.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,
    /// Read buffer used while digesting uploads. Default: 64 KiB.
    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,
}

fn default_blob_dir() -> PathBuf {
    PathBuf::from("./data/blobs")
}
fn default_max_upload_size() -> u64 {
    128 * 1024 * 1024
}
fn default_read_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            blob_dir: default_blob_dir(),
            max_upload_size: default_max_upload_size(),
            read_chunk_size: default_read_chunk_size(),
        }
    }
}

/// Construct the configured blob store.
pub async fn build_blob_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>, StorageError> {
    match config.backend {
        StorageBackend::Filesystem => {
            info!(dir = %config.blob_dir.display(), "Using filesystem blob store");
            let store = FilesystemBlobStore::new(
                config.blob_dir.clone(),
                config.max_upload_size,
                config.read_chunk_size,
            )
            .await?;
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            info!("Using in-memory blob store");
            Ok(Arc::new(MemoryBlobStore::new(
                config.max_upload_size,
                config.read_chunk_size,
            )))
        }
    }
}
