//! Text encoding and line handling.
//!
//! - [`TextCodec`] - Encoding choice, BOM sniffing and strictness
//! - [`TextDecoder`] / [`TextEncoder`] - Incremental conversion used by the transfer drivers
//! - [`LineSplitter`] - Splits decoded text on CR, LF or CRLF
//! - [`LineEnding`] - Terminator appended by line writers

mod codec;
mod lines;

pub use codec::{TextCodec, TextDecoder, TextEncoder};
pub use lines::{LineEnding, LineSplitter, split_lines};

pub(crate) use lines::{LineDecoder, LineEncoder};
