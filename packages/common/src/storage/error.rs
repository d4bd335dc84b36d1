use std::fmt;

/// Errors that can occur while digesting or storing blobs.
#[derive(Debug)]
pub enum StorageError {
    /// The requested blob handle is not known to the store.
    NotFound(String),
    /// The caller's byte source failed mid-stream.
    Read(std::io::Error),
    /// Persisting bytes to the store failed.
    Io(std::io::Error),
    /// The provided content hash is invalid.
    InvalidHash(String),
    /// The provided blob handle is malformed.
    InvalidHandle(String),
    /// The blob exceeds the configured size limit.
    SizeLimitExceeded { actual: u64, limit: u64 },
}

impl StorageError {
    /// Whether the failure came from the caller's byte source rather than the store.
    pub fn is_read_error(&self) -> bool {
        matches!(self, Self::Read(_))
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(handle) => write!(f, "blob not found: {handle}"),
            Self::Read(err) => write!(f, "failed to read byte source: {err}"),
            Self::Io(err) => write!(f, "storage IO error: {err}"),
            Self::InvalidHash(msg) => write!(f, "invalid content hash: {msg}"),
            Self::InvalidHandle(msg) => write!(f, "invalid blob handle: {msg}"),
            Self::SizeLimitExceeded { actual, limit } => {
                write!(f, "blob exceeds size limit ({actual} > {limit} bytes)")
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) | Self::Read(err) => Some(err),
            _ => None,
        }
    }
}

/// Bare IO errors are attributed to the store. Source failures are wrapped
/// explicitly as [`StorageError::Read`] at the read site.
impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
