//! Growth-doubling read loop.
//!
//! Two paths:
//!
//! - **Known length** `n > 0`: one exact allocation, filled by repeated reads.
//!   End-of-stream before `n` bytes is an error.
//! - **Unknown length** (`None` or a reported `0`): a pooled buffer that
//!   doubles each time it fills, capped at the configured ceiling.
//!
//! At the ceiling a one-byte probe read decides between end-of-stream and
//! [`TransferError::FileTooLarge`], so a file of exactly the ceiling size
//! still reads.

use std::io::{self, Read};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::buffer::{BufferPool, PooledBuffer, SharedPool};
use crate::config::TransferConfig;
use crate::error::TransferError;

#[cfg(feature = "async-io")]
use futures_io::AsyncRead;
#[cfg(feature = "async-io")]
use futures_util::io::AsyncReadExt;
#[cfg(feature = "async-io")]
use tokio_util::sync::CancellationToken;

/// Outcome of feeding one read result to [`ReadAll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Done,
}

#[derive(Debug)]
enum Fill {
    Exact {
        buf: Vec<u8>,
    },
    Growing {
        buf: PooledBuffer,
        capacity: usize,
        probe: [u8; 1],
        probing: bool,
    },
}

/// Sans-IO state of one read-to-end loop.
#[derive(Debug)]
struct ReadAll {
    fill: Fill,
    filled: usize,
    max: usize,
    pool: Arc<dyn BufferPool>,
}

impl ReadAll {
    fn new(
        length: Option<u64>,
        config: &TransferConfig,
        pool: &Arc<dyn BufferPool>,
    ) -> Result<Self, TransferError> {
        let max = config.max_buffer_len();
        let fill = match length {
            Some(len) if len > max as u64 => {
                return Err(TransferError::FileTooLarge { length: len, max });
            }
            // A reported zero is not trusted: special files report 0 and still have content
            Some(len) if len > 0 => {
                let len = len as usize;
                let mut buf = Vec::new();
                buf.try_reserve_exact(len)
                    .map_err(|_| TransferError::CapacityExceeded { requested: len, max })?;
                buf.resize(len, 0);
                Fill::Exact { buf }
            }
            _ => {
                let capacity = config.initial_buffer_size();
                Fill::Growing {
                    buf: PooledBuffer::rent(pool, capacity)?,
                    capacity,
                    probe: [0],
                    probing: false,
                }
            }
        };

        Ok(Self {
            fill,
            filled: 0,
            max,
            pool: Arc::clone(pool),
        })
    }

    /// The region the next read must fill. Never empty.
    fn unfilled(&mut self) -> &mut [u8] {
        match &mut self.fill {
            Fill::Exact { buf } => &mut buf[self.filled..],
            Fill::Growing {
                probe,
                probing: true,
                ..
            } => &mut probe[..],
            Fill::Growing { buf, capacity, .. } => &mut buf[self.filled..*capacity],
        }
    }

    /// Records a read of `n` bytes into [`ReadAll::unfilled`].
    fn advance(&mut self, n: usize) -> Result<Step, TransferError> {
        match &mut self.fill {
            Fill::Exact { buf } => {
                if n == 0 {
                    return Err(TransferError::UnexpectedEndOfFile {
                        expected: buf.len() as u64,
                        actual: self.filled as u64,
                    });
                }
                self.filled += n;
                if self.filled == buf.len() {
                    Ok(Step::Done)
                } else {
                    Ok(Step::Continue)
                }
            }
            Fill::Growing { probing: true, .. } if n > 0 => Err(TransferError::FileTooLarge {
                length: self.filled as u64 + n as u64,
                max: self.max,
            }),
            Fill::Growing { .. } if n == 0 => Ok(Step::Done),
            Fill::Growing { capacity, .. } => {
                let capacity = *capacity;
                self.filled += n;
                if self.filled == capacity {
                    self.grow()?;
                }
                Ok(Step::Continue)
            }
        }
    }

    fn grow(&mut self) -> Result<(), TransferError> {
        let Fill::Growing {
            buf,
            capacity,
            probing,
            ..
        } = &mut self.fill
        else {
            return Ok(());
        };

        if *capacity >= self.max {
            *probing = true;
            return Ok(());
        }

        let next_capacity = capacity.saturating_mul(2).min(self.max);
        let mut next = PooledBuffer::rent(&self.pool, next_capacity)?;
        next[..self.filled].copy_from_slice(&buf[..self.filled]);
        // The old buffer goes back to the pool here
        *buf = next;
        *capacity = next_capacity;
        trace!(capacity = next_capacity, "grew read buffer");
        Ok(())
    }

    /// Produces the exact-length result.
    fn finish(self) -> Vec<u8> {
        match self.fill {
            Fill::Exact { buf } => buf,
            Fill::Growing { buf, .. } => buf.into_vec(self.filled),
        }
    }
}

/// Reads a handle to its end into one exact-length buffer.
///
/// The advertised length is a hint. A positive length is trusted to size
/// the result and verified against end-of-stream; a missing or zero length
/// switches to pooled growth.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use wholefile::GrowableReader;
///
/// let reader = GrowableReader::default();
/// let data = reader.read_to_end(&mut Cursor::new(vec![7u8; 2000]), None)?;
/// assert_eq!(data.len(), 2000);
/// # Ok::<(), wholefile::TransferError>(())
/// ```
#[derive(Debug, Clone)]
pub struct GrowableReader {
    config: TransferConfig,
    pool: Arc<dyn BufferPool>,
}

impl GrowableReader {
    /// Creates a reader with the given configuration and buffer pool.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::InvalidArgument`] if `config` does not validate.
    pub fn new(config: TransferConfig, pool: Arc<dyn BufferPool>) -> Result<Self, TransferError> {
        config.validate()?;
        Ok(Self { config, pool })
    }

    /// Swaps the buffer pool, keeping the already validated configuration.
    pub(crate) fn with_pool(&self, pool: Arc<dyn BufferPool>) -> Self {
        Self {
            config: self.config,
            pool,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Returns the buffer pool.
    pub fn pool(&self) -> &Arc<dyn BufferPool> {
        &self.pool
    }

    /// Reads `reader` to end-of-stream.
    ///
    /// # Errors
    ///
    /// - [`TransferError::FileTooLarge`] if `length` or the data read exceeds the ceiling
    /// - [`TransferError::UnexpectedEndOfFile`] if fewer than a positive `length` bytes arrive
    /// - [`TransferError::Io`] for errors from `reader`
    pub fn read_to_end<R: Read + ?Sized>(
        &self,
        reader: &mut R,
        length: Option<u64>,
    ) -> Result<Vec<u8>, TransferError> {
        let mut state = ReadAll::new(length, &self.config, &self.pool)?;
        loop {
            let n = match reader.read(state.unfilled()) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if state.advance(n)? == Step::Done {
                let data = state.finish();
                debug!(len = data.len(), "read to end");
                return Ok(data);
            }
        }
    }

    /// Non-blocking [`GrowableReader::read_to_end`].
    ///
    /// `token` is checked before every read. A cancelled read returns
    /// [`TransferError::Cancelled`] after the rented buffer is returned.
    #[cfg(feature = "async-io")]
    pub async fn read_to_end_async<R: AsyncRead + Unpin + ?Sized>(
        &self,
        reader: &mut R,
        length: Option<u64>,
        token: &CancellationToken,
    ) -> Result<Vec<u8>, TransferError> {
        if token.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        let mut state = ReadAll::new(length, &self.config, &self.pool)?;
        loop {
            if token.is_cancelled() {
                return Err(TransferError::Cancelled);
            }
            let n = match reader.read(state.unfilled()).await {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if state.advance(n)? == Step::Done {
                let data = state.finish();
                debug!(len = data.len(), "read to end");
                return Ok(data);
            }
        }
    }
}

impl Default for GrowableReader {
    fn default() -> Self {
        Self {
            config: TransferConfig::default(),
            pool: SharedPool::global(),
        }
    }
}
