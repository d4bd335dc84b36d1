use chrono::{DateTime, SubsecRound, Utc};
use common::storage::{BlobHandle, ContentHash};
use uuid::Uuid;

/// Metadata for one unique stored blob.
///
/// A record is built once at insert time. The only field that ever changes
/// afterwards is `reference_count`, and only through the repository's atomic
/// increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: Uuid,
    pub content_hash: ContentHash,
    /// Name given by the first uploader of this content.
    pub original_filename: String,
    /// MIME type declared by the first uploader.
    pub content_type: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub reference_count: u64,
    pub blob_handle: BlobHandle,
}

/// Input to [`FileRecordRepository::insert`](crate::repository::FileRecordRepository::insert).
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub content_hash: ContentHash,
    pub original_filename: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub blob_handle: BlobHandle,
}

impl NewFileRecord {
    /// Materialize the record with a fresh id, the current time and a
    /// reference count of one. The timestamp is truncated to microseconds,
    /// the finest precision every backend stores.
    pub fn into_record(self) -> FileRecord {
        FileRecord {
            id: Uuid::now_v7(),
            content_hash: self.content_hash,
            original_filename: self.original_filename,
            content_type: self.content_type,
            size_bytes: self.size_bytes,
            created_at: Utc::now().trunc_subsecs(6),
            reference_count: 1,
            blob_handle: self.blob_handle,
        }
    }
}

/// Optional predicates for listing records. All bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Case-insensitive substring of the original filename.
    pub search: Option<String>,
    /// Exact content type.
    pub file_type: Option<String>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl RecordFilter {
    /// Swap the date bounds if they were given in the wrong order.
    pub fn normalized(mut self) -> Self {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date)
            && start > end
        {
            self.start_date = Some(end);
            self.end_date = Some(start);
        }
        self
    }

    pub fn matches(&self, record: &FileRecord) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !record.original_filename.to_lowercase().contains(&needle) {
                return false;
            }
        }
        if let Some(file_type) = &self.file_type
            && &record.content_type != file_type
        {
            return false;
        }
        if self.min_size.is_some_and(|min| record.size_bytes < min) {
            return false;
        }
        if self.max_size.is_some_and(|max| record.size_bytes > max) {
            return false;
        }
        if self.start_date.is_some_and(|start| record.created_at < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| record.created_at > end) {
            return false;
        }
        true
    }
}
