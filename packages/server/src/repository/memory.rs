use async_trait::async_trait;
use common::storage::ContentHash;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::{AggregateSizes, FileRecordRepository, RepositoryError, sort_newest_first};
use crate::record::{FileRecord, NewFileRecord, RecordFilter};

/// Repository held entirely in process memory.
///
/// Records are sharded by digest; every operation locks only the shard that
/// owns its digest, so uploads of different content never contend on a
/// shared lock.
#[derive(Default)]
pub struct MemoryRepository {
    records: DashMap<ContentHash, FileRecord>,
    ids: DashMap<Uuid, ContentHash>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileRecordRepository for MemoryRepository {
    async fn find_by_digest(
        &self,
        digest: &ContentHash,
    ) -> Result<Option<FileRecord>, RepositoryError> {
        Ok(self.records.get(digest).map(|r| r.value().clone()))
    }

    async fn insert(&self, record: NewFileRecord) -> Result<FileRecord, RepositoryError> {
        match self.records.entry(record.content_hash) {
            Entry::Occupied(_) => Err(RepositoryError::DuplicateDigest(record.content_hash)),
            Entry::Vacant(slot) => {
                let record = record.into_record();
                self.ids.insert(record.id, record.content_hash);
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn increment_reference(
        &self,
        digest: &ContentHash,
    ) -> Result<FileRecord, RepositoryError> {
        let mut record = self
            .records
            .get_mut(digest)
            .ok_or(RepositoryError::NotFound(*digest))?;
        record.reference_count += 1;
        Ok(record.clone())
    }

    async fn aggregate_sizes(&self) -> Result<AggregateSizes, RepositoryError> {
        let mut sizes = AggregateSizes::default();
        for record in self.records.iter() {
            sizes.add(record.size_bytes, record.reference_count);
        }
        Ok(sizes)
    }

    async fn get(&self, id: Uuid) -> Result<Option<FileRecord>, RepositoryError> {
        let Some(digest) = self.ids.get(&id).map(|d| *d) else {
            return Ok(None);
        };
        self.find_by_digest(&digest).await
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<FileRecord>, RepositoryError> {
        let mut records: Vec<FileRecord> = self
            .records
            .iter()
            .filter(|r| filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        sort_newest_first(&mut records);
        Ok(records)
    }
}
