use common::storage::{BlobHandle, ContentHash, StorageError};
use tracing::{info, warn};

/// Notable things that happen during ingestion.
#[derive(Debug, Clone, Copy)]
pub enum DiagnosticEvent<'a> {
    /// Content was already stored; its reference count went up.
    DedupHit {
        hash: &'a ContentHash,
        reference_count: u64,
    },
    /// First upload of this content; a record and blob were created.
    RecordCreated {
        hash: &'a ContentHash,
        size_bytes: u64,
        handle: &'a BlobHandle,
    },
    /// A concurrent upload inserted the record first. The blob written by
    /// this upload is now unreferenced.
    InsertRaceLost {
        hash: &'a ContentHash,
        orphaned: &'a BlobHandle,
    },
    /// Releasing the staged copy of a duplicate failed.
    DiscardFailed {
        hash: &'a ContentHash,
        error: &'a StorageError,
    },
}

/// Receiver for ingestion diagnostics, injected into the coordinator.
pub trait DiagnosticsSink: Send + Sync {
    fn emit(&self, event: DiagnosticEvent<'_>);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn emit(&self, event: DiagnosticEvent<'_>) {
        match event {
            DiagnosticEvent::DedupHit {
                hash,
                reference_count,
            } => info!(%hash, reference_count, "Dedup hit"),
            DiagnosticEvent::RecordCreated {
                hash,
                size_bytes,
                handle,
            } => info!(%hash, size_bytes, %handle, "Stored new content"),
            DiagnosticEvent::InsertRaceLost { hash, orphaned } => {
                warn!(%hash, %orphaned, "Lost insert race; blob orphaned")
            }
            DiagnosticEvent::DiscardFailed { hash, error } => {
                warn!(%hash, %error, "Failed to discard staged duplicate")
            }
        }
    }
}
