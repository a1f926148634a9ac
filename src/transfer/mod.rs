//! Whole-file operations.
//!
//! - [`FileTransfer`] - Reads and writes whole files as bytes, text or lines
//! - [`Lines`] - Lazy line iterator that owns its file handle
//! - [`LineStream`] - Non-blocking, cancellable counterpart of [`Lines`] (feature `async-io`)
//!
//! Every operation validates its arguments before touching the file system
//! and releases its handle and rented buffers before returning, on success,
//! error and cancellation alike.
//!
//! The free functions in this module use a default [`FileTransfer`] over the
//! operating system's file system and the process-wide buffer pool. Text
//! functions read UTF-8 (honoring a UTF-8 or UTF-16 BOM) and write strict
//! UTF-8 without a BOM.

mod blocking;
#[cfg(feature = "async-io")]
mod nonblocking;

use std::path::Path;
use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::config::TransferConfig;
use crate::error::TransferError;
use crate::handle::OsFileSystem;
use crate::reader::GrowableReader;
use crate::text::TextCodec;

pub use blocking::Lines;
#[cfg(feature = "async-io")]
pub use nonblocking::LineStream;

#[cfg(feature = "async-io")]
use tokio_util::sync::CancellationToken;

/// Reads and writes whole files.
///
/// `FileTransfer` is stateless apart from its configuration, its file system
/// and its buffer pool, so one instance can serve concurrent operations.
/// Blocking operations are available when `F` implements
/// [`FileSystem`](crate::FileSystem); the `*_async` operations when it
/// implements [`AsyncFileSystem`](crate::AsyncFileSystem).
///
/// # Example
///
/// ```no_run
/// use wholefile::{FileTransfer, TextCodec};
///
/// let transfer = FileTransfer::new();
/// transfer.write_all_text("notes.txt", "first\nsecond\n", &TextCodec::utf8())?;
/// let lines = transfer.read_all_lines("notes.txt", &TextCodec::utf8())?;
/// assert_eq!(lines, ["first", "second"]);
/// # Ok::<(), wholefile::TransferError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileTransfer<F = OsFileSystem> {
    fs: F,
    reader: GrowableReader,
}

impl FileTransfer<OsFileSystem> {
    /// Creates a transfer over the operating system's file system with the
    /// default configuration and the process-wide buffer pool.
    pub fn new() -> Self {
        Self::with_file_system(OsFileSystem)
    }
}

impl Default for FileTransfer<OsFileSystem> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> FileTransfer<F> {
    /// Creates a transfer over a custom file system.
    pub fn with_file_system(fs: F) -> Self {
        Self {
            fs,
            reader: GrowableReader::default(),
        }
    }

    /// Replaces the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::InvalidArgument`] if `config` does not validate.
    pub fn with_config(self, config: TransferConfig) -> Result<Self, TransferError> {
        let pool = Arc::clone(self.reader.pool());
        Ok(Self {
            fs: self.fs,
            reader: GrowableReader::new(config, pool)?,
        })
    }

    /// Replaces the buffer pool.
    pub fn with_pool(self, pool: Arc<dyn BufferPool>) -> Self {
        Self {
            reader: self.reader.with_pool(pool),
            fs: self.fs,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TransferConfig {
        self.reader.config()
    }

    /// Returns the file system.
    pub fn file_system(&self) -> &F {
        &self.fs
    }

    fn pool(&self) -> &Arc<dyn BufferPool> {
        self.reader.pool()
    }
}

/// Reads the entire file into an exact-length byte vector.
pub fn read_all_bytes(path: impl AsRef<Path>) -> Result<Vec<u8>, TransferError> {
    FileTransfer::new().read_all_bytes(path)
}

/// Creates or truncates the file and writes `bytes`.
pub fn write_all_bytes(path: impl AsRef<Path>, bytes: impl AsRef<[u8]>) -> Result<(), TransferError> {
    FileTransfer::new().write_all_bytes(path, bytes)
}

/// Appends `bytes` to the file, creating it if absent.
pub fn append_all_bytes(path: impl AsRef<Path>, bytes: impl AsRef<[u8]>) -> Result<(), TransferError> {
    FileTransfer::new().append_all_bytes(path, bytes)
}

/// Reads the entire file as UTF-8 text, honoring a BOM if present.
pub fn read_all_text(path: impl AsRef<Path>) -> Result<String, TransferError> {
    FileTransfer::new().read_all_text(path, &TextCodec::default())
}

/// Creates or truncates the file and writes `text` as UTF-8 without a BOM.
pub fn write_all_text(path: impl AsRef<Path>, text: &str) -> Result<(), TransferError> {
    FileTransfer::new().write_all_text(path, text, &TextCodec::default())
}

/// Appends `text` as UTF-8 without a BOM, creating the file if absent.
pub fn append_all_text(path: impl AsRef<Path>, text: &str) -> Result<(), TransferError> {
    FileTransfer::new().append_all_text(path, text, &TextCodec::default())
}

/// Reads the entire file as UTF-8 lines.
pub fn read_all_lines(path: impl AsRef<Path>) -> Result<Vec<String>, TransferError> {
    FileTransfer::new().read_all_lines(path, &TextCodec::default())
}

/// Opens the file and returns a lazy UTF-8 line iterator over it.
pub fn read_lines(path: impl AsRef<Path>) -> Result<Lines<std::fs::File>, TransferError> {
    FileTransfer::new().read_lines(path, &TextCodec::default())
}

/// Creates or truncates the file and writes each line followed by the platform line ending.
pub fn write_all_lines<I>(path: impl AsRef<Path>, lines: I) -> Result<(), TransferError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    FileTransfer::new().write_all_lines(path, lines, &TextCodec::default())
}

/// Appends each line followed by the platform line ending, creating the file if absent.
pub fn append_all_lines<I>(path: impl AsRef<Path>, lines: I) -> Result<(), TransferError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    FileTransfer::new().append_all_lines(path, lines, &TextCodec::default())
}

/// Non-blocking [`read_all_bytes`].
#[cfg(feature = "async-io")]
pub async fn read_all_bytes_async(
    path: impl AsRef<Path>,
    token: &CancellationToken,
) -> Result<Vec<u8>, TransferError> {
    FileTransfer::new().read_all_bytes_async(path, token).await
}

/// Non-blocking [`write_all_bytes`].
#[cfg(feature = "async-io")]
pub async fn write_all_bytes_async(
    path: impl AsRef<Path>,
    bytes: impl AsRef<[u8]>,
    token: &CancellationToken,
) -> Result<(), TransferError> {
    FileTransfer::new()
        .write_all_bytes_async(path, bytes, token)
        .await
}

/// Non-blocking [`append_all_bytes`].
#[cfg(feature = "async-io")]
pub async fn append_all_bytes_async(
    path: impl AsRef<Path>,
    bytes: impl AsRef<[u8]>,
    token: &CancellationToken,
) -> Result<(), TransferError> {
    FileTransfer::new()
        .append_all_bytes_async(path, bytes, token)
        .await
}

/// Non-blocking [`read_all_text`].
#[cfg(feature = "async-io")]
pub async fn read_all_text_async(
    path: impl AsRef<Path>,
    token: &CancellationToken,
) -> Result<String, TransferError> {
    FileTransfer::new()
        .read_all_text_async(path, &TextCodec::default(), token)
        .await
}

/// Non-blocking [`write_all_text`].
#[cfg(feature = "async-io")]
pub async fn write_all_text_async(
    path: impl AsRef<Path>,
    text: &str,
    token: &CancellationToken,
) -> Result<(), TransferError> {
    FileTransfer::new()
        .write_all_text_async(path, text, &TextCodec::default(), token)
        .await
}

/// Non-blocking [`append_all_text`].
#[cfg(feature = "async-io")]
pub async fn append_all_text_async(
    path: impl AsRef<Path>,
    text: &str,
    token: &CancellationToken,
) -> Result<(), TransferError> {
    FileTransfer::new()
        .append_all_text_async(path, text, &TextCodec::default(), token)
        .await
}

/// Non-blocking [`read_all_lines`].
#[cfg(feature = "async-io")]
pub async fn read_all_lines_async(
    path: impl AsRef<Path>,
    token: &CancellationToken,
) -> Result<Vec<String>, TransferError> {
    FileTransfer::new()
        .read_all_lines_async(path, &TextCodec::default(), token)
        .await
}

/// Non-blocking [`read_lines`].
#[cfg(feature = "async-io")]
pub async fn read_lines_async(
    path: impl AsRef<Path>,
    token: &CancellationToken,
) -> Result<LineStream<async_fs::File>, TransferError> {
    FileTransfer::new()
        .read_lines_async(path, &TextCodec::default(), token)
        .await
}

/// Non-blocking [`write_all_lines`].
#[cfg(feature = "async-io")]
pub async fn write_all_lines_async<I>(
    path: impl AsRef<Path>,
    lines: I,
    token: &CancellationToken,
) -> Result<(), TransferError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    FileTransfer::new()
        .write_all_lines_async(path, lines, &TextCodec::default(), token)
        .await
}

/// Non-blocking [`append_all_lines`].
#[cfg(feature = "async-io")]
pub async fn append_all_lines_async<I>(
    path: impl AsRef<Path>,
    lines: I,
    token: &CancellationToken,
) -> Result<(), TransferError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    FileTransfer::new()
        .append_all_lines_async(path, lines, &TextCodec::default(), token)
        .await
}
