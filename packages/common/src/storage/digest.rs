use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::error::StorageError;
use super::hash::ContentHash;

/// Default read buffer used when streaming a source through the digester.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Incremental SHA-256 digester that also counts bytes.
///
/// Feeding the same byte sequence always produces the same
/// `(ContentHash, size)` pair, however the sequence is split across
/// [`update`](Self::update) calls.
#[derive(Clone, Default)]
pub struct ContentDigester {
    hasher: Sha256,
    size: u64,
}

impl ContentDigester {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.size += chunk.len() as u64;
    }

    /// Bytes consumed so far.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn finish(self) -> (ContentHash, u64) {
        (ContentHash::from_bytes(self.hasher.finalize().into()), self.size)
    }
}

/// Consume `reader` once and return its content hash and byte count.
///
/// Memory use is bounded by `chunk_size`. A failing reader yields
/// [`StorageError::Read`].
pub async fn digest_reader<R>(
    reader: &mut R,
    chunk_size: usize,
) -> Result<(ContentHash, u64), StorageError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    digest_copy(reader, &mut tokio::io::sink(), chunk_size, u64::MAX).await
}

/// Copy `reader` into `writer` in one pass, digesting every chunk on the way.
///
/// Fails with [`StorageError::SizeLimitExceeded`] as soon as more than
/// `max_size` bytes have been read; nothing past the limit reaches `writer`.
/// Source failures are [`StorageError::Read`], sink failures
/// [`StorageError::Io`].
pub async fn digest_copy<R, W>(
    reader: &mut R,
    writer: &mut W,
    chunk_size: usize,
    max_size: u64,
) -> Result<(ContentHash, u64), StorageError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut digester = ContentDigester::new();
    let mut buf = vec![0u8; chunk_size.max(1)];

    loop {
        let n = reader.read(&mut buf).await.map_err(StorageError::Read)?;
        if n == 0 {
            break;
        }

        let total_bytes = digester.size() + n as u64;
        if total_bytes > max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: total_bytes,
                limit: max_size,
            });
        }

        digester.update(&buf[..n]);
        writer.write_all(&buf[..n]).await?;
    }

    writer.flush().await?;
    Ok(digester.finish())
}
