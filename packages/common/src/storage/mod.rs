mod digest;
mod error;
mod handle;
mod hash;
mod staged;
mod traits;

pub mod filesystem;
pub mod memory;

pub use digest::{ContentDigester, DEFAULT_CHUNK_SIZE, digest_copy, digest_reader};
pub use error::StorageError;
pub use handle::BlobHandle;
pub use hash::{ContentHash, EMPTY_CONTENT_HASH};
pub use staged::StagedBlob;
pub use traits::{BlobStore, BoxReader};
