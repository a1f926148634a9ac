//! Configuration for transfer behavior.
//!
//! - [`TransferConfig`] - Read-loop buffer sizing, line-transfer staging and line endings
//!
//! # Example
//!
//! ```
//! use wholefile::{LineEnding, TransferConfig};
//!
//! // Custom scratch size and ceiling
//! let config = TransferConfig::new(1024, 1 << 20)?;
//!
//! // Builder pattern
//! let config = TransferConfig::default()
//!     .with_chunk_size(16 * 1024)
//!     .with_line_ending(LineEnding::CrLf);
//!
//! # Ok::<(), wholefile::TransferError>(())
//! ```

use crate::error::TransferError;
use crate::text::LineEnding;

/// Largest single buffer the engine will allocate (`0x7FFF_FFC7` bytes).
pub const MAX_BUFFER_LEN: usize = 0x7FFF_FFC7;

/// Default initial capacity for the unknown-length read loop.
pub const DEFAULT_INITIAL_BUFFER_SIZE: usize = 512;

/// Default size of the staging buffers used by line-oriented transfers.
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024;

/// Configuration for whole-file transfers.
///
/// Size constraints: `0 < initial_buffer_size <= max_buffer_len <= MAX_BUFFER_LEN`.
///
/// The initial buffer size is a tuning knob only. Any small value gives the
/// same results; it changes how many doublings an unknown-length read takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransferConfig {
    initial_buffer_size: usize,
    max_buffer_len: usize,
    chunk_size: usize,
    line_ending: LineEnding,
}

impl TransferConfig {
    /// Creates a new configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::InvalidArgument`] if:
    /// - `initial_buffer_size` is zero
    /// - `initial_buffer_size > max_buffer_len`
    /// - `max_buffer_len > MAX_BUFFER_LEN`
    pub fn new(initial_buffer_size: usize, max_buffer_len: usize) -> Result<Self, TransferError> {
        if initial_buffer_size == 0 {
            return Err(TransferError::invalid("initial buffer size must be non-zero"));
        }

        if initial_buffer_size > max_buffer_len {
            return Err(TransferError::invalid(
                "initial buffer size cannot be greater than max buffer length",
            ));
        }

        if max_buffer_len > MAX_BUFFER_LEN {
            return Err(TransferError::invalid(
                "max buffer length cannot exceed MAX_BUFFER_LEN",
            ));
        }

        Ok(Self {
            initial_buffer_size,
            max_buffer_len,
            ..Self::default()
        })
    }

    /// Sets the initial capacity of the unknown-length read loop.
    ///
    /// Note: This does not validate the configuration. Use [`TransferConfig::validate`]
    /// to check if the configuration is valid.
    pub fn with_initial_buffer_size(mut self, size: usize) -> Self {
        self.initial_buffer_size = size;
        self
    }

    /// Sets the buffer ceiling.
    ///
    /// Note: This does not validate the configuration.
    pub fn with_max_buffer_len(mut self, len: usize) -> Self {
        self.max_buffer_len = len;
        self
    }

    /// Sets the staging buffer size for line-oriented transfers: the read size
    /// of lazy line readers and the batch size of line writers.
    ///
    /// A size of zero is treated as one: line writers write after every line.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Sets the terminator appended after each written line.
    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Returns the initial capacity of the unknown-length read loop.
    pub fn initial_buffer_size(&self) -> usize {
        self.initial_buffer_size
    }

    /// Returns the buffer ceiling.
    pub fn max_buffer_len(&self) -> usize {
        self.max_buffer_len
    }

    /// Returns the line-transfer staging buffer size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the line terminator used by line writers.
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Validates the current configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use wholefile::TransferConfig;
    ///
    /// let config = TransferConfig::default().with_initial_buffer_size(0);
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), TransferError> {
        Self::new(self.initial_buffer_size, self.max_buffer_len).map(|_| ())
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            initial_buffer_size: DEFAULT_INITIAL_BUFFER_SIZE,
            max_buffer_len: MAX_BUFFER_LEN,
            chunk_size: DEFAULT_CHUNK_SIZE,
            line_ending: LineEnding::platform(),
        }
    }
}
