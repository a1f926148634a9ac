//! Error types for wholefile.

use thiserror::Error;

/// Errors that can occur during whole-file transfers.
///
/// Argument errors are reported before any file is opened or buffer
/// rented. Every other variant is reported only after the operation has
/// released everything it acquired.
#[derive(Debug, Error)]
pub enum TransferError {
    /// A caller-supplied argument was rejected before any I/O happened.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of what was invalid.
        message: &'static str,
    },

    /// The file is larger than the largest single buffer the engine will allocate.
    #[error("file too large: {length} bytes (max {max})")]
    FileTooLarge {
        /// Advertised length, or the length reached when growth was refused.
        length: u64,
        /// The buffer ceiling in effect.
        max: usize,
    },

    /// The handle reported end-of-stream before the advertised length was read.
    #[error("unexpected end of file: read {actual} of {expected} bytes")]
    UnexpectedEndOfFile {
        /// Length the handle advertised.
        expected: u64,
        /// Bytes actually read before end-of-stream.
        actual: u64,
    },

    /// The input bytes are malformed for the encoding in use.
    #[error("malformed {encoding} byte sequence")]
    Decode {
        /// Name of the encoding.
        encoding: &'static str,
    },

    /// A character cannot be represented in the target encoding.
    #[error("character {character:?} cannot be encoded as {encoding}")]
    Encode {
        /// Name of the encoding.
        encoding: &'static str,
        /// The first unrepresentable character.
        character: char,
    },

    /// The buffer pool cannot hand out a buffer of the requested size.
    #[error("buffer capacity exceeded: requested {requested} bytes (max {max})")]
    CapacityExceeded {
        /// Requested minimum capacity.
        requested: usize,
        /// Largest capacity the pool supports.
        max: usize,
    },

    /// The operation observed its cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// An I/O error reported by the file handle, passed through unchanged.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TransferError {
    /// Returns `true` if this is the cancelled outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransferError::Cancelled)
    }

    pub(crate) fn invalid(message: &'static str) -> Self {
        TransferError::InvalidArgument { message }
    }
}
