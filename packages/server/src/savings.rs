use std::sync::Arc;

use serde::Serialize;

use crate::repository::{AggregateSizes, FileRecordRepository, RepositoryError};

/// Space reclaimed by deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, utoipa::ToSchema)]
pub struct SavingsReport {
    /// Bytes that would be stored without deduplication.
    #[schema(example = 200)]
    pub total_logical_bytes: u64,
    /// Bytes actually stored, one copy per unique content.
    #[schema(example = 100)]
    pub unique_stored_bytes: u64,
    #[schema(example = 100)]
    pub savings_bytes: u64,
    /// `savings_bytes` as a percentage of `total_logical_bytes`; 0 when nothing is stored.
    #[schema(example = 50.0)]
    pub savings_percentage: f64,
}

impl From<AggregateSizes> for SavingsReport {
    fn from(sizes: AggregateSizes) -> Self {
        let savings_bytes = sizes
            .total_logical_bytes
            .saturating_sub(sizes.unique_stored_bytes);
        let savings_percentage = if sizes.total_logical_bytes > 0 {
            savings_bytes as f64 / sizes.total_logical_bytes as f64 * 100.0
        } else {
            0.0
        };
        Self {
            total_logical_bytes: sizes.total_logical_bytes,
            unique_stored_bytes: sizes.unique_stored_bytes,
            savings_bytes,
            savings_percentage,
        }
    }
}

/// Computes [`SavingsReport`]s from current repository state. Nothing is cached.
pub struct SavingsAccountant {
    repository: Arc<dyn FileRecordRepository>,
}

impl SavingsAccountant {
    pub fn new(repository: Arc<dyn FileRecordRepository>) -> Self {
        Self { repository }
    }

    pub async fn report(&self) -> Result<SavingsReport, RepositoryError> {
        Ok(self.repository.aggregate_sizes().await?.into())
    }
}
