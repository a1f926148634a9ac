//! wholefile
//!
//! Whole-file read and write operations over a pluggable file system.
//!
//! `wholefile` reads an entire file into memory, or writes an entire buffer
//! out, in one call. It covers the three shapes callers usually want:
//!
//! - bytes: exact-length `Vec<u8>`
//! - text: `String`, decoded with BOM sniffing and encoded with an optional preamble
//! - lines: eager `Vec<String>` or a lazy iterator/stream that owns its handle
//!
//! Reads of unknown length grow a pooled scratch buffer geometrically up to a
//! configurable ceiling; reads of known length allocate exactly once. Every
//! blocking operation has a non-blocking counterpart that accepts a
//! cancellation token.
//!
//! # Sync
//!
//! ```no_run
//! use wholefile::{FileTransfer, TextCodec, TransferError};
//!
//! fn main() -> Result<(), TransferError> {
//!     wholefile::write_all_text("greeting.txt", "hello\nworld\n")?;
//!     assert_eq!(wholefile::read_all_lines("greeting.txt")?, ["hello", "world"]);
//!
//!     let transfer = FileTransfer::new();
//!     transfer.write_all_text("wide.txt", "hi", &TextCodec::utf16le())?;
//!     for line in transfer.read_lines("wide.txt", &TextCodec::utf8())? {
//!         println!("{}", line?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Async (feature = "async-io")
//!
//! ```ignore
//! use futures_util::StreamExt;
//! use wholefile::{CancellationToken, TransferError};
//!
//! async fn demo(token: CancellationToken) -> Result<(), TransferError> {
//!     let bytes = wholefile::read_all_bytes_async("data.bin", &token).await?;
//!     wholefile::write_all_bytes_async("copy.bin", &bytes, &token).await?;
//!
//!     let mut lines = wholefile::read_lines_async("notes.txt", &token).await?;
//!     while let Some(line) = lines.next().await {
//!         println!("{}", line?);
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod buffer;
mod config;
mod error;
mod handle;
mod reader;
mod text;
mod transfer;

mod util; // internal path validation

//
// Public surface
//

pub use buffer::{BufferPool, PooledBuffer, SharedPool, TrackingPool};
pub use config::{DEFAULT_CHUNK_SIZE, DEFAULT_INITIAL_BUFFER_SIZE, MAX_BUFFER_LEN, TransferConfig};
pub use error::TransferError;
pub use handle::{Access, FileHandle, FileSystem, OpenMode, OpenOptions, OsFileSystem, Share};
pub use reader::GrowableReader;
pub use text::{LineEnding, LineSplitter, TextCodec, TextDecoder, TextEncoder, split_lines};
pub use transfer::{
    FileTransfer, Lines, append_all_bytes, append_all_lines, append_all_text, read_all_bytes,
    read_all_lines, read_all_text, read_lines, write_all_bytes, write_all_lines, write_all_text,
};

#[cfg(feature = "async-io")]
pub use handle::{AsyncFileHandle, AsyncFileSystem};
#[cfg(feature = "async-io")]
pub use tokio_util::sync::CancellationToken;
#[cfg(feature = "async-io")]
pub use transfer::{
    LineStream, append_all_bytes_async, append_all_lines_async, append_all_text_async,
    read_all_bytes_async, read_all_lines_async, read_all_text_async, read_lines_async,
    write_all_bytes_async, write_all_lines_async, write_all_text_async,
};
