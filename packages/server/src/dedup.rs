//! Upload intake: digest, dedup decision, and reference counting.

use std::sync::Arc;

use common::storage::{BlobStore, BoxReader, ContentHash};

use crate::diagnostics::{DiagnosticEvent, DiagnosticsSink, TracingSink};
use crate::error::IngestError;
use crate::record::{FileRecord, NewFileRecord};
use crate::repository::{FileRecordRepository, RepositoryError};

/// Result of a successful [`DedupCoordinator::ingest`].
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub record: FileRecord,
    /// `true` if this upload created the record, `false` on a dedup hit.
    pub created: bool,
}

/// Coordinates the blob store and the record repository so that each
/// distinct content is stored once and counted once per upload.
pub struct DedupCoordinator {
    repository: Arc<dyn FileRecordRepository>,
    blob_store: Arc<dyn BlobStore>,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl DedupCoordinator {
    pub fn new(repository: Arc<dyn FileRecordRepository>, blob_store: Arc<dyn BlobStore>) -> Self {
        Self::with_diagnostics(repository, blob_store, Arc::new(TracingSink))
    }

    pub fn with_diagnostics(
        repository: Arc<dyn FileRecordRepository>,
        blob_store: Arc<dyn BlobStore>,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            repository,
            blob_store,
            diagnostics,
        }
    }

    /// Ingest one upload.
    ///
    /// The source is read exactly once: it is spooled into the blob store's
    /// staging area while being digested. A staged duplicate is discarded
    /// without ever becoming visible; new content is committed before its
    /// record is inserted, so a record never points at missing bytes.
    pub async fn ingest(
        &self,
        source: Option<BoxReader<'_>>,
        original_filename: &str,
        content_type: &str,
    ) -> Result<IngestOutcome, IngestError> {
        let source =
            source.ok_or_else(|| IngestError::Validation("no file content supplied".into()))?;

        let staged = self.blob_store.stage(source).await?;
        let hash = staged.content_hash();

        if self.repository.find_by_digest(&hash).await?.is_some() {
            if let Err(error) = self.blob_store.discard(staged).await {
                self.diagnostics.emit(DiagnosticEvent::DiscardFailed {
                    hash: &hash,
                    error: &error,
                });
            }
            return self.add_reference(&hash).await;
        }

        let size_bytes = staged.size();
        let handle = self.blob_store.commit(staged).await?;
        let new_record = NewFileRecord {
            content_hash: hash,
            original_filename: original_filename.to_string(),
            content_type: content_type.to_string(),
            size_bytes,
            blob_handle: handle,
        };

        match self.repository.insert(new_record).await {
            Ok(record) => {
                self.diagnostics.emit(DiagnosticEvent::RecordCreated {
                    hash: &hash,
                    size_bytes,
                    handle: &handle,
                });
                Ok(IngestOutcome {
                    record,
                    created: true,
                })
            }
            Err(RepositoryError::DuplicateDigest(_)) => {
                self.diagnostics.emit(DiagnosticEvent::InsertRaceLost {
                    hash: &hash,
                    orphaned: &handle,
                });
                match self.add_reference(&hash).await {
                    Err(IngestError::NotFound(_)) => Err(IngestError::Conflict(hash)),
                    outcome => outcome,
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn add_reference(&self, hash: &ContentHash) -> Result<IngestOutcome, IngestError> {
        let record = self.repository.increment_reference(hash).await?;
        self.diagnostics.emit(DiagnosticEvent::DedupHit {
            hash,
            reference_count: record.reference_count,
        });
        Ok(IngestOutcome {
            record,
            created: false,
        })
    }

    pub fn repository(&self) -> &Arc<dyn FileRecordRepository> {
        &self.repository
    }

    pub fn blob_store(&self) -> &Arc<dyn BlobStore> {
        &self.blob_store
    }
}
