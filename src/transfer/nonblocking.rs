//! Non-blocking, cancellable whole-file operations.
//!
//! Each operation mirrors its blocking counterpart and shares its core
//! state machines. A [`CancellationToken`] is checked before anything else
//! happens and again before every read or write and every line. Cancellation
//! is cooperative: an in-flight read or write completes before the next check.

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_io::AsyncRead;
use futures_util::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::FileTransfer;
use crate::buffer::{BufferPool, PooledBuffer};
use crate::error::TransferError;
use crate::handle::{AsyncFileHandle, AsyncFileSystem, OpenMode, OpenOptions};
use crate::text::{LineDecoder, LineEncoder, TextCodec, split_lines};
use crate::util::validate_path;

fn checkpoint(token: &CancellationToken) -> Result<(), TransferError> {
    if token.is_cancelled() {
        Err(TransferError::Cancelled)
    } else {
        Ok(())
    }
}

impl<F: AsyncFileSystem> FileTransfer<F> {
    /// Non-blocking [`FileTransfer::read_all_bytes`].
    ///
    /// An already-cancelled `token` returns [`TransferError::Cancelled`]
    /// without touching the file system.
    pub async fn read_all_bytes_async(
        &self,
        path: impl AsRef<Path>,
        token: &CancellationToken,
    ) -> Result<Vec<u8>, TransferError> {
        let path = path.as_ref();
        validate_path(path)?;
        checkpoint(token)?;

        let mut handle = self.fs.open(path, &OpenOptions::read()).await?;
        checkpoint(token)?;
        let length = handle.length().await?;
        let data = self
            .reader
            .read_to_end_async(&mut handle, length, token)
            .await?;
        debug!(path = %path.display(), ?length, len = data.len(), "read all bytes");
        Ok(data)
    }

    /// Non-blocking [`FileTransfer::write_all_bytes`].
    pub async fn write_all_bytes_async(
        &self,
        path: impl AsRef<Path>,
        bytes: impl AsRef<[u8]>,
        token: &CancellationToken,
    ) -> Result<(), TransferError> {
        let path = path.as_ref();
        validate_path(path)?;
        checkpoint(token)?;
        self.write_bytes_async(path, bytes.as_ref(), OpenOptions::truncate(), token)
            .await
    }

    /// Non-blocking [`FileTransfer::append_all_bytes`].
    pub async fn append_all_bytes_async(
        &self,
        path: impl AsRef<Path>,
        bytes: impl AsRef<[u8]>,
        token: &CancellationToken,
    ) -> Result<(), TransferError> {
        let path = path.as_ref();
        validate_path(path)?;
        checkpoint(token)?;
        self.write_bytes_async(path, bytes.as_ref(), OpenOptions::append(), token)
            .await
    }

    /// Non-blocking [`FileTransfer::read_all_text`].
    pub async fn read_all_text_async(
        &self,
        path: impl AsRef<Path>,
        codec: &TextCodec,
        token: &CancellationToken,
    ) -> Result<String, TransferError> {
        let bytes = self.read_all_bytes_async(path, token).await?;
        codec.decode(&bytes)
    }

    /// Non-blocking [`FileTransfer::write_all_text`].
    pub async fn write_all_text_async(
        &self,
        path: impl AsRef<Path>,
        text: &str,
        codec: &TextCodec,
        token: &CancellationToken,
    ) -> Result<(), TransferError> {
        self.write_text_async(path.as_ref(), text, codec, OpenOptions::truncate(), token)
            .await
    }

    /// Non-blocking [`FileTransfer::append_all_text`].
    pub async fn append_all_text_async(
        &self,
        path: impl AsRef<Path>,
        text: &str,
        codec: &TextCodec,
        token: &CancellationToken,
    ) -> Result<(), TransferError> {
        self.write_text_async(path.as_ref(), text, codec, OpenOptions::append(), token)
            .await
    }

    /// Non-blocking [`FileTransfer::read_all_lines`].
    pub async fn read_all_lines_async(
        &self,
        path: impl AsRef<Path>,
        codec: &TextCodec,
        token: &CancellationToken,
    ) -> Result<Vec<String>, TransferError> {
        let text = self.read_all_text_async(path, codec, token).await?;
        Ok(split_lines(&text))
    }

    /// Non-blocking [`FileTransfer::read_lines`].
    ///
    /// The stream keeps a clone of `token` and checks it before every line.
    pub async fn read_lines_async(
        &self,
        path: impl AsRef<Path>,
        codec: &TextCodec,
        token: &CancellationToken,
    ) -> Result<LineStream<F::Handle>, TransferError> {
        let path = path.as_ref();
        validate_path(path)?;
        checkpoint(token)?;

        let handle = self.fs.open(path, &OpenOptions::read()).await?;
        debug!(path = %path.display(), encoding = codec.name(), "opened line stream");
        LineStream::new(
            handle,
            codec,
            self.pool(),
            self.config().chunk_size(),
            token.clone(),
        )
    }

    /// Non-blocking [`FileTransfer::write_all_lines`].
    pub async fn write_all_lines_async<I>(
        &self,
        path: impl AsRef<Path>,
        lines: I,
        codec: &TextCodec,
        token: &CancellationToken,
    ) -> Result<(), TransferError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let path = path.as_ref();
        validate_path(path)?;
        checkpoint(token)?;
        self.write_lines_async(path, lines, codec, OpenOptions::truncate(), token)
            .await
    }

    /// Non-blocking [`FileTransfer::append_all_lines`].
    pub async fn append_all_lines_async<I>(
        &self,
        path: impl AsRef<Path>,
        lines: I,
        codec: &TextCodec,
        token: &CancellationToken,
    ) -> Result<(), TransferError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let path = path.as_ref();
        validate_path(path)?;
        checkpoint(token)?;
        self.write_lines_async(path, lines, codec, OpenOptions::append(), token)
            .await
    }

    async fn write_bytes_async(
        &self,
        path: &Path,
        bytes: &[u8],
        options: OpenOptions,
        token: &CancellationToken,
    ) -> Result<(), TransferError> {
        let mut handle = self.fs.open(path, &options).await?;
        checkpoint(token)?;
        handle.write_all(bytes).await?;
        handle.flush().await?;
        debug!(path = %path.display(), len = bytes.len(), mode = ?options.mode(), "wrote all bytes");
        Ok(())
    }

    async fn write_text_async(
        &self,
        path: &Path,
        text: &str,
        codec: &TextCodec,
        options: OpenOptions,
        token: &CancellationToken,
    ) -> Result<(), TransferError> {
        validate_path(path)?;
        checkpoint(token)?;
        let encoded = if text.is_empty() {
            Vec::new()
        } else {
            codec.encode(text)?
        };

        let mut handle = self.fs.open(path, &options).await?;
        checkpoint(token)?;
        if !encoded.is_empty() {
            let preamble = match options.mode() {
                OpenMode::Append => handle.length().await? == Some(0),
                _ => true,
            };
            if preamble {
                handle.write_all(codec.preamble()).await?;
            }
            handle.write_all(&encoded).await?;
        }
        handle.flush().await?;
        debug!(path = %path.display(), len = encoded.len(), encoding = codec.name(), mode = ?options.mode(), "wrote text");
        Ok(())
    }

    async fn write_lines_async<I>(
        &self,
        path: &Path,
        lines: I,
        codec: &TextCodec,
        options: OpenOptions,
        token: &CancellationToken,
    ) -> Result<(), TransferError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut handle = self.fs.open(path, &options).await?;
        let preamble = match options.mode() {
            OpenMode::Append => handle.length().await? == Some(0),
            _ => true,
        };
        let config = self.config();
        let mut encoder = LineEncoder::new(codec, config.line_ending(), config.chunk_size(), preamble);

        let mut count = 0usize;
        for line in lines {
            checkpoint(token)?;
            if let Err(e) = encoder.push_line(line.as_ref()) {
                // Lines before the failing one still reach the file
                handle.write_all(encoder.pending()).await?;
                handle.flush().await?;
                return Err(e);
            }
            count += 1;
            if encoder.is_ready() {
                handle.write_all(encoder.pending()).await?;
                encoder.clear();
            }
        }
        checkpoint(token)?;
        encoder.finish()?;
        handle.write_all(encoder.pending()).await?;
        handle.flush().await?;
        debug!(path = %path.display(), lines = count, mode = ?options.mode(), "wrote lines");
        Ok(())
    }
}

/// A lazy, cancellable stream of lines read from a file.
///
/// Yields each line without its terminator. The token is checked before
/// every line; once it fires the stream yields [`TransferError::Cancelled`]
/// and ends. The handle is released as soon as the end of the file is
/// reached, the first error is yielded, [`LineStream::close`] is called, or
/// the stream is dropped.
///
/// # Example
///
/// ```ignore
/// use futures_util::StreamExt;
/// use tokio_util::sync::CancellationToken;
/// use wholefile::{FileTransfer, TextCodec};
///
/// async fn count_errors(token: CancellationToken) -> Result<usize, wholefile::TransferError> {
///     let transfer = FileTransfer::new();
///     let mut lines = transfer
///         .read_lines_async("server.log", &TextCodec::utf8(), &token)
///         .await?;
///
///     let mut errors = 0;
///     while let Some(line) = lines.next().await {
///         if line?.contains("ERROR") {
///             errors += 1;
///         }
///     }
///     Ok(errors)
/// }
/// ```
#[derive(Debug)]
pub struct LineStream<H> {
    handle: Option<H>,
    buffer: Option<PooledBuffer>,
    chunk_size: usize,
    decoder: LineDecoder,
    token: CancellationToken,
    closed: bool,
}

impl<H> LineStream<H> {
    fn new(
        handle: H,
        codec: &TextCodec,
        pool: &Arc<dyn BufferPool>,
        chunk_size: usize,
        token: CancellationToken,
    ) -> Result<Self, TransferError> {
        Ok(Self {
            handle: Some(handle),
            buffer: Some(PooledBuffer::rent(pool, chunk_size)?),
            chunk_size,
            decoder: LineDecoder::new(codec),
            token,
            closed: false,
        })
    }

    /// Releases the handle and ends the stream.
    pub fn close(&mut self) {
        self.release();
        self.closed = true;
    }

    /// Returns `true` while the underlying handle is still held.
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    fn release(&mut self) {
        self.handle = None;
        self.buffer = None;
    }
}

impl<H: AsyncRead + Unpin> Stream for LineStream<H> {
    type Item = Result<String, TransferError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        if this.closed {
            return Poll::Ready(None);
        }

        loop {
            if this.token.is_cancelled() {
                this.close();
                return Poll::Ready(Some(Err(TransferError::Cancelled)));
            }
            if let Some(line) = this.decoder.next_line() {
                return Poll::Ready(Some(Ok(line)));
            }
            if this.decoder.is_eof() {
                this.close();
                return Poll::Ready(None);
            }

            let (Some(handle), Some(buffer)) = (this.handle.as_mut(), this.buffer.as_mut()) else {
                this.close();
                return Poll::Ready(None);
            };
            let n = match Pin::new(handle).poll_read(cx, &mut buffer[..this.chunk_size]) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Ok(n)) => n,
                Poll::Ready(Err(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
                Poll::Ready(Err(e)) => {
                    this.close();
                    return Poll::Ready(Some(Err(e.into())));
                }
            };
            let fed = this.decoder.feed(&buffer[..n]);
            if n == 0 {
                this.release();
            }
            if let Err(e) = fed {
                this.close();
                return Poll::Ready(Some(Err(e)));
            }
        }
    }
}
