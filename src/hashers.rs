//! Chunked, cooperative SHA3-256 hashing.
//!
//! A [`ChunkedHasher`] pulls a [`FileSource`] through an [`Accumulator`] one
//! bounded chunk at a time and yields to the tokio scheduler between chunks,
//! so a single large file never monopolizes the runtime thread. Memory use is
//! one chunk buffer regardless of file size.

use crate::error::{HashError, Result};
use crate::models::Algorithm;
use async_trait::async_trait;
use futures::channel::mpsc;
use sha3::{Digest, Sha3_256};
use std::io;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Read access to an immutable byte sequence of known length.
#[async_trait]
pub trait FileSource: Send {
    /// Total length in bytes.
    fn size(&self) -> u64;

    /// Read up to `buf.len()` bytes starting at `offset`.
    ///
    /// Returns the number of bytes written to `buf`, which may be short but
    /// never more than `buf.len()`. Zero means no more data is available at
    /// `offset`.
    async fn read_range(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;
}

#[async_trait]
impl<'a> FileSource for &'a [u8] {
    fn size(&self) -> u64 {
        self.len() as u64
    }

    async fn read_range(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset out of range"))?;
        let Some(rest) = self.get(start..) else {
            return Ok(0);
        };
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        Ok(n)
    }
}

/// Incremental hash state. `finalize` consumes it, so it cannot be fed again.
pub struct Accumulator {
    inner: Sha3_256,
}

impl Accumulator {
    pub fn new(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Sha3_256 => Accumulator {
                inner: Sha3_256::new(),
            },
        }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    /// Lowercase hex digest.
    pub fn finalize(self) -> String {
        hex::encode(self.inner.finalize())
    }
}

/// Hash an in-memory buffer in one step.
pub fn hash_bytes(algorithm: Algorithm, data: &[u8]) -> String {
    let mut acc = Accumulator::new(algorithm);
    acc.update(data);
    acc.finalize()
}

/// Percentage of `total` covered by `done`, floored and clamped to 100.
fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = u128::from(done) * 100 / u128::from(total);
    pct.min(100) as u8
}

#[derive(Debug, Clone)]
pub struct ChunkedHasher {
    algorithm: Algorithm,
    chunk_size: usize,
    cancel: Option<CancellationToken>,
}

impl Default for ChunkedHasher {
    fn default() -> Self {
        Self::new(Algorithm::default())
    }
}

impl ChunkedHasher {
    pub fn new(algorithm: Algorithm) -> Self {
        ChunkedHasher {
            algorithm,
            chunk_size: DEFAULT_CHUNK_SIZE,
            cancel: None,
        }
    }

    /// Build a hasher from a configured algorithm name.
    pub fn from_name(name: &str) -> Result<Self> {
        Ok(Self::new(name.parse()?))
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Abort at the next chunk boundary once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub async fn hash<S>(&self, source: &mut S) -> Result<String>
    where
        S: FileSource + ?Sized,
    {
        self.hash_with_progress(source, |_| {}).await
    }

    /// Hash `source`, calling `on_progress` with the completed percentage
    /// after every chunk.
    ///
    /// Progress never decreases and reaches 100 exactly when the last chunk
    /// has been fed. An empty source reports 100 once and reads nothing.
    pub async fn hash_with_progress<S, F>(&self, source: &mut S, mut on_progress: F) -> Result<String>
    where
        S: FileSource + ?Sized,
        F: FnMut(u8) + Send,
    {
        if self.chunk_size == 0 {
            return Err(HashError::InvalidChunkSize);
        }

        let total = source.size();
        let mut acc = Accumulator::new(self.algorithm);

        if total == 0 {
            on_progress(100);
            return Ok(acc.finalize());
        }

        let buf_len = usize::try_from(total).map_or(self.chunk_size, |t| t.min(self.chunk_size));
        let mut buf = vec![0u8; buf_len];
        let mut offset = 0u64;

        while offset < total {
            if self.is_cancelled() {
                debug!(offset, total, "hash cancelled at chunk boundary");
                return Err(HashError::Cancelled);
            }

            let remaining = total - offset;
            let want = usize::try_from(remaining).map_or(buf_len, |r| r.min(buf_len));
            let n = source.read_range(offset, &mut buf[..want]).await?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("source ended at byte {offset} of {total}"),
                )
                .into());
            }
            if n > want {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("source returned {n} bytes for a {want} byte read at {offset}"),
                )
                .into());
            }

            acc.update(&buf[..n]);
            offset += n as u64;
            on_progress(percent(offset, total));

            if offset < total {
                tokio::task::yield_now().await;
            }
        }

        let digest = acc.finalize();
        info!(algorithm = %self.algorithm, bytes = total, "hash complete");
        Ok(digest)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

/// A hash running on its own tokio task.
pub struct HashTask {
    /// Progress updates in the order they were produced. Ends when the task
    /// finishes.
    pub progress: mpsc::UnboundedReceiver<u8>,
    handle: JoinHandle<Result<String>>,
}

impl HashTask {
    /// Wait for the digest.
    pub async fn digest(self) -> Result<String> {
        self.handle
            .await
            .map_err(|e| HashError::Join(e.to_string()))?
    }
}

/// Run `hasher` over `source` in the background, streaming progress over a
/// channel instead of a callback.
pub fn spawn_hash<S>(hasher: ChunkedHasher, mut source: S) -> HashTask
where
    S: FileSource + 'static,
{
    let (tx, rx) = mpsc::unbounded();
    let handle = tokio::spawn(async move {
        hasher
            .hash_with_progress(&mut source, |pct| {
                // receiver may have been dropped; the digest still matters
                let _ = tx.unbounded_send(pct);
            })
            .await
    });
    HashTask {
        progress: rx,
        handle,
    }
}
