//! Blocking whole-file operations.

use std::io::{self, Read, Write};
use std::iter::FusedIterator;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::FileTransfer;
use crate::buffer::{BufferPool, PooledBuffer};
use crate::error::TransferError;
use crate::handle::{FileHandle, FileSystem, OpenMode, OpenOptions};
use crate::text::{LineDecoder, LineEncoder, TextCodec, split_lines};
use crate::util::validate_path;

impl<F: FileSystem> FileTransfer<F> {
    /// Reads the entire file into an exact-length byte vector.
    ///
    /// # Errors
    ///
    /// - [`TransferError::InvalidArgument`] if `path` is empty
    /// - [`TransferError::FileTooLarge`] if the file exceeds the buffer ceiling
    /// - [`TransferError::UnexpectedEndOfFile`] if the file shrank while being read
    /// - [`TransferError::Io`] for errors from the file system
    pub fn read_all_bytes(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, TransferError> {
        let path = path.as_ref();
        validate_path(path)?;

        let mut handle = self.fs.open(path, &OpenOptions::read())?;
        let length = handle.length()?;
        let data = self.reader.read_to_end(&mut handle, length)?;
        debug!(path = %path.display(), ?length, len = data.len(), "read all bytes");
        Ok(data)
    }

    /// Creates or truncates the file and writes `bytes` from offset 0.
    pub fn write_all_bytes(
        &self,
        path: impl AsRef<Path>,
        bytes: impl AsRef<[u8]>,
    ) -> Result<(), TransferError> {
        let path = path.as_ref();
        validate_path(path)?;
        self.write_bytes(path, bytes.as_ref(), OpenOptions::truncate())
    }

    /// Appends `bytes` to the file, creating it if absent.
    pub fn append_all_bytes(
        &self,
        path: impl AsRef<Path>,
        bytes: impl AsRef<[u8]>,
    ) -> Result<(), TransferError> {
        let path = path.as_ref();
        validate_path(path)?;
        self.write_bytes(path, bytes.as_ref(), OpenOptions::append())
    }

    /// Reads the entire file as text.
    ///
    /// A UTF-8 or UTF-16 BOM selects the encoding and is stripped; otherwise
    /// `codec` decodes the bytes.
    pub fn read_all_text(
        &self,
        path: impl AsRef<Path>,
        codec: &TextCodec,
    ) -> Result<String, TransferError> {
        let bytes = self.read_all_bytes(path)?;
        codec.decode(&bytes)
    }

    /// Creates or truncates the file and writes `text`.
    ///
    /// Empty text leaves an empty file. Otherwise the codec's preamble, if
    /// any, precedes the encoded text.
    pub fn write_all_text(
        &self,
        path: impl AsRef<Path>,
        text: &str,
        codec: &TextCodec,
    ) -> Result<(), TransferError> {
        let path = path.as_ref();
        validate_path(path)?;
        let encoded = encode_text(text, codec)?;

        let mut handle = self.fs.open(path, &OpenOptions::truncate())?;
        if !encoded.is_empty() {
            handle.write_all(codec.preamble())?;
            handle.write_all(&encoded)?;
        }
        handle.flush()?;
        debug!(path = %path.display(), len = encoded.len(), encoding = codec.name(), "wrote all text");
        Ok(())
    }

    /// Appends `text`, creating the file if absent.
    ///
    /// The codec's preamble is written only when the file is empty.
    pub fn append_all_text(
        &self,
        path: impl AsRef<Path>,
        text: &str,
        codec: &TextCodec,
    ) -> Result<(), TransferError> {
        let path = path.as_ref();
        validate_path(path)?;
        let encoded = encode_text(text, codec)?;

        let mut handle = self.fs.open(path, &OpenOptions::append())?;
        if !encoded.is_empty() {
            if handle.length()? == Some(0) {
                handle.write_all(codec.preamble())?;
            }
            handle.write_all(&encoded)?;
        }
        handle.flush()?;
        debug!(path = %path.display(), len = encoded.len(), encoding = codec.name(), "appended text");
        Ok(())
    }

    /// Reads the entire file and splits it on CR, LF or CRLF.
    ///
    /// A trailing line terminator does not produce a final empty line.
    pub fn read_all_lines(
        &self,
        path: impl AsRef<Path>,
        codec: &TextCodec,
    ) -> Result<Vec<String>, TransferError> {
        let text = self.read_all_text(path, codec)?;
        Ok(split_lines(&text))
    }

    /// Opens the file and returns a lazy line iterator over it.
    ///
    /// The file is opened eagerly, so a missing file is reported here. The
    /// iterator owns the handle and releases it when exhausted, on the first
    /// error, on [`Lines::close`], or when dropped.
    pub fn read_lines(
        &self,
        path: impl AsRef<Path>,
        codec: &TextCodec,
    ) -> Result<Lines<F::Handle>, TransferError> {
        let path = path.as_ref();
        validate_path(path)?;

        let handle = self.fs.open(path, &OpenOptions::read())?;
        debug!(path = %path.display(), encoding = codec.name(), "opened line reader");
        Lines::new(handle, codec, self.pool(), self.config().chunk_size())
    }

    /// Creates or truncates the file and writes each line followed by the
    /// configured line ending.
    ///
    /// If a line cannot be encoded, the lines before it are written and
    /// flushed before the error is returned.
    pub fn write_all_lines<I>(
        &self,
        path: impl AsRef<Path>,
        lines: I,
        codec: &TextCodec,
    ) -> Result<(), TransferError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let path = path.as_ref();
        validate_path(path)?;
        self.write_lines(path, lines, codec, OpenOptions::truncate())
    }

    /// Appends each line followed by the configured line ending, creating the
    /// file if absent.
    pub fn append_all_lines<I>(
        &self,
        path: impl AsRef<Path>,
        lines: I,
        codec: &TextCodec,
    ) -> Result<(), TransferError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let path = path.as_ref();
        validate_path(path)?;
        self.write_lines(path, lines, codec, OpenOptions::append())
    }

    fn write_bytes(
        &self,
        path: &Path,
        bytes: &[u8],
        options: OpenOptions,
    ) -> Result<(), TransferError> {
        let mut handle = self.fs.open(path, &options)?;
        handle.write_all(bytes)?;
        handle.flush()?;
        debug!(path = %path.display(), len = bytes.len(), mode = ?options.mode(), "wrote all bytes");
        Ok(())
    }

    fn write_lines<I>(
        &self,
        path: &Path,
        lines: I,
        codec: &TextCodec,
        options: OpenOptions,
    ) -> Result<(), TransferError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut handle = self.fs.open(path, &options)?;
        let preamble = match options.mode() {
            OpenMode::Append => handle.length()? == Some(0),
            _ => true,
        };
        let config = self.config();
        let mut encoder = LineEncoder::new(codec, config.line_ending(), config.chunk_size(), preamble);

        let mut count = 0usize;
        for line in lines {
            if let Err(e) = encoder.push_line(line.as_ref()) {
                // Lines before the failing one still reach the file
                handle.write_all(encoder.pending())?;
                handle.flush()?;
                return Err(e);
            }
            count += 1;
            if encoder.is_ready() {
                handle.write_all(encoder.pending())?;
                encoder.clear();
            }
        }
        encoder.finish()?;
        handle.write_all(encoder.pending())?;
        handle.flush()?;
        debug!(path = %path.display(), lines = count, mode = ?options.mode(), "wrote lines");
        Ok(())
    }
}

fn encode_text(text: &str, codec: &TextCodec) -> Result<Vec<u8>, TransferError> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    codec.encode(text)
}

/// A lazy, finite, non-restartable sequence of lines read from a file.
///
/// Each item is one line without its terminator. The handle is released as
/// soon as the end of the file is reached, the first error is yielded,
/// [`Lines::close`] is called, or the iterator is dropped, whichever comes
/// first.
///
/// # Example
///
/// ```no_run
/// use wholefile::{FileTransfer, TextCodec};
///
/// let transfer = FileTransfer::new();
/// for line in transfer.read_lines("server.log", &TextCodec::utf8())? {
///     let line = line?;
///     if line.contains("FATAL") {
///         // Breaking out drops the iterator and closes the file
///         break;
///     }
/// }
/// # Ok::<(), wholefile::TransferError>(())
/// ```
#[derive(Debug)]
pub struct Lines<H> {
    handle: Option<H>,
    buffer: Option<PooledBuffer>,
    chunk_size: usize,
    decoder: LineDecoder,
    closed: bool,
}

impl<H: Read> Lines<H> {
    fn new(
        handle: H,
        codec: &TextCodec,
        pool: &Arc<dyn BufferPool>,
        chunk_size: usize,
    ) -> Result<Self, TransferError> {
        Ok(Self {
            handle: Some(handle),
            buffer: Some(PooledBuffer::rent(pool, chunk_size)?),
            chunk_size,
            decoder: LineDecoder::new(codec),
            closed: false,
        })
    }
}

impl<H> Lines<H> {
    /// Releases the handle and ends the sequence.
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

impl<H: Read> Iterator for Lines<H> {
    type Item = Result<String, TransferError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }

        loop {
            if let Some(line) = self.decoder.next_line() {
                return Some(Ok(line));
            }
            if self.decoder.is_eof() {
                self.close();
                return None;
            }

            let (Some(handle), Some(buffer)) = (self.handle.as_mut(), self.buffer.as_mut()) else {
                self.close();
                return None;
            };
            let n = match handle.read(&mut buffer[..self.chunk_size]) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.close();
                    return Some(Err(e.into()));
                }
            };
            let fed = self.decoder.feed(&buffer[..n]);
            if n == 0 {
                self.release();
            }
            if let Err(e) = fed {
                self.close();
                return Some(Err(e));
            }
        }
    }
}

impl<H: Read> FusedIterator for Lines<H> {}
