pub mod config;
pub mod storage;

pub use config::{StorageBackend, StorageConfig, build_blob_store};
