mod database;
mod memory;

pub use database::DatabaseRepository;
pub use memory::MemoryRepository;

use async_trait::async_trait;
use common::storage::ContentHash;
use thiserror::Error;
use uuid::Uuid;

use crate::record::{FileRecord, NewFileRecord, RecordFilter};

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A record for this digest already exists. Returned by `insert` when it
    /// loses a race against a concurrent identical upload.
    #[error("a record for digest {0} already exists")]
    DuplicateDigest(ContentHash),

    #[error("no record for digest {0}")]
    NotFound(ContentHash),

    /// A stored row could not be mapped back to a record.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Sums over all records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateSizes {
    /// Σ size × reference count.
    pub total_logical_bytes: u64,
    /// Σ size, each unique blob counted once.
    pub unique_stored_bytes: u64,
}

impl AggregateSizes {
    pub fn add(&mut self, size_bytes: u64, reference_count: u64) {
        self.total_logical_bytes = self
            .total_logical_bytes
            .saturating_add(size_bytes.saturating_mul(reference_count));
        self.unique_stored_bytes = self.unique_stored_bytes.saturating_add(size_bytes);
    }
}

/// Durable mapping from content digest to [`FileRecord`].
///
/// Implementations must make `insert` an atomic compare-and-insert and
/// `increment_reference` an atomic read-modify-write, without serializing
/// operations on unrelated digests.
#[async_trait]
pub trait FileRecordRepository: Send + Sync {
    async fn find_by_digest(
        &self,
        digest: &ContentHash,
    ) -> Result<Option<FileRecord>, RepositoryError>;

    /// Insert a new record with a reference count of one.
    ///
    /// Fails with [`RepositoryError::DuplicateDigest`] if the digest is taken.
    async fn insert(&self, record: NewFileRecord) -> Result<FileRecord, RepositoryError>;

    /// Add one reference and return the updated record.
    async fn increment_reference(
        &self,
        digest: &ContentHash,
    ) -> Result<FileRecord, RepositoryError>;

    async fn aggregate_sizes(&self) -> Result<AggregateSizes, RepositoryError>;

    async fn get(&self, id: Uuid) -> Result<Option<FileRecord>, RepositoryError>;

    /// Records matching `filter`, newest first.
    async fn list(&self, filter: &RecordFilter) -> Result<Vec<FileRecord>, RepositoryError>;
}

/// Newest first, ties broken by id so the order is total.
pub(crate) fn sort_newest_first(records: &mut [FileRecord]) {
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
