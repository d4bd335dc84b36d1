use std::sync::Arc;

use common::storage::BlobStore;

use crate::config::AppConfig;
use crate::dedup::DedupCoordinator;
use crate::repository::FileRecordRepository;
use crate::savings::SavingsAccountant;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<DedupCoordinator>,
    pub accountant: Arc<SavingsAccountant>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn FileRecordRepository>,
        blob_store: Arc<dyn BlobStore>,
        config: AppConfig,
    ) -> Self {
        Self {
            coordinator: Arc::new(DedupCoordinator::new(repository.clone(), blob_store)),
            accountant: Arc::new(SavingsAccountant::new(repository)),
            config,
        }
    }

    pub fn repository(&self) -> &Arc<dyn FileRecordRepository> {
        self.coordinator.repository()
    }

    pub fn blob_store(&self) -> &Arc<dyn BlobStore> {
        self.coordinator.blob_store()
    }
}
