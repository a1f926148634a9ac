//! Line splitting and line-oriented encoding.

use crate::error::TransferError;
use crate::text::{TextCodec, TextDecoder, TextEncoder};

/// Line terminator written after each line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineEnding {
    /// `\n`
    Lf,
    /// `\r\n`
    CrLf,
    /// `\r`
    Cr,
}

impl LineEnding {
    /// The terminator native to the target platform.
    pub const fn platform() -> Self {
        if cfg!(windows) {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }

    /// Returns the terminator text.
    pub const fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
            LineEnding::Cr => "\r",
        }
    }
}

impl Default for LineEnding {
    fn default() -> Self {
        Self::platform()
    }
}

/// Finds the first line in `text`, searching from byte `from`.
///
/// `text[..from]` must hold no CR or LF. Returns `(content_end, next_start)`.
/// A CR at the very end is only a terminator when `eof` is set, since a LF
/// may still follow.
fn find_line(text: &str, from: usize, eof: bool) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let found = bytes[from..]
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .map(|i| i + from);
    match found {
        Some(i) if bytes[i] == b'\n' => Some((i, i + 1)),
        Some(i) => match bytes.get(i + 1) {
            Some(b'\n') => Some((i, i + 2)),
            Some(_) => Some((i, i + 1)),
            None if eof => Some((i, i + 1)),
            None => None,
        },
        None if eof && !text.is_empty() => Some((text.len(), text.len())),
        None => None,
    }
}

/// Splits text on CR, LF or CRLF.
///
/// A trailing terminator does not produce a final empty line.
///
/// # Example
///
/// ```
/// use wholefile::split_lines;
///
/// assert_eq!(split_lines("a\r\nb\rc\n"), ["a", "b", "c"]);
/// assert_eq!(split_lines("a\n\nb"), ["a", "", "b"]);
/// assert!(split_lines("").is_empty());
/// ```
pub fn split_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut rest = text;
    while let Some((end, next)) = find_line(rest, 0, true) {
        lines.push(rest[..end].to_owned());
        rest = &rest[next..];
    }
    lines
}

/// Incremental line splitter over text that arrives in pieces.
///
/// Append text through [`LineSplitter::buffer_mut`], then drain complete
/// lines with [`LineSplitter::next_line`].
#[derive(Debug, Default)]
pub struct LineSplitter {
    buf: String,
    pos: usize,
    // Bytes after `pos` already searched without finding a terminator
    scanned: usize,
}

impl LineSplitter {
    /// Creates an empty splitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pending text buffer for appending.
    pub fn buffer_mut(&mut self) -> &mut String {
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        &mut self.buf
    }

    /// Appends text.
    pub fn push_str(&mut self, text: &str) {
        self.buffer_mut().push_str(text);
    }

    /// Takes the next complete line.
    ///
    /// With `eof` set, an unterminated tail is returned as the last line.
    /// Text already searched is not searched again, so a long line that
    /// arrives in many pieces costs time linear in its length.
    pub fn next_line(&mut self, eof: bool) -> Option<String> {
        let rest = &self.buf[self.pos..];
        match find_line(rest, self.scanned.min(rest.len()), eof) {
            Some((end, next)) => {
                let line = rest[..end].to_owned();
                self.pos += next;
                self.scanned = 0;
                Some(line)
            }
            None => {
                // A trailing CR is looked at again once more text arrives
                self.scanned = rest.strip_suffix('\r').unwrap_or(rest).len();
                None
            }
        }
    }
}

/// Bytes in, lines out: a [`TextDecoder`] feeding a [`LineSplitter`].
#[derive(Debug)]
pub(crate) struct LineDecoder {
    decoder: TextDecoder,
    splitter: LineSplitter,
    eof: bool,
}

impl LineDecoder {
    pub(crate) fn new(codec: &TextCodec) -> Self {
        Self {
            decoder: codec.decoder(),
            splitter: LineSplitter::new(),
            eof: false,
        }
    }

    /// Decodes one read's worth of bytes. An empty slice marks end-of-stream.
    pub(crate) fn feed(&mut self, bytes: &[u8]) -> Result<(), TransferError> {
        let last = bytes.is_empty();
        self.decoder
            .decode(bytes, last, self.splitter.buffer_mut())?;
        self.eof = last;
        Ok(())
    }

    pub(crate) fn next_line(&mut self) -> Option<String> {
        self.splitter.next_line(self.eof)
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.eof
    }
}

/// Lines in, bytes out: encodes lines with a terminator into a staging buffer.
///
/// The driver writes [`LineEncoder::pending`] whenever [`LineEncoder::is_ready`]
/// and after [`LineEncoder::finish`].
#[derive(Debug)]
pub(crate) struct LineEncoder {
    encoder: TextEncoder,
    terminator: &'static str,
    out: Vec<u8>,
    chunk_size: usize,
}

impl LineEncoder {
    pub(crate) fn new(codec: &TextCodec, terminator: LineEnding, chunk_size: usize, preamble: bool) -> Self {
        let mut out = Vec::with_capacity(chunk_size);
        if preamble {
            out.extend_from_slice(codec.preamble());
        }
        Self {
            encoder: codec.encoder(),
            terminator: terminator.as_str(),
            out,
            chunk_size,
        }
    }

    /// Stages `line` and its terminator. On error nothing of `line` stays staged.
    pub(crate) fn push_line(&mut self, line: &str) -> Result<(), TransferError> {
        let staged = self.out.len();
        let result = self
            .encoder
            .encode(line, false, &mut self.out)
            .and_then(|()| self.encoder.encode(self.terminator, false, &mut self.out));
        if result.is_err() {
            self.out.truncate(staged);
        }
        result
    }

    pub(crate) fn finish(&mut self) -> Result<(), TransferError> {
        self.encoder.encode("", true, &mut self.out)
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.out.len() >= self.chunk_size
    }

    pub(crate) fn pending(&self) -> &[u8] {
        &self.out
    }

    pub(crate) fn clear(&mut self) {
        self.out.clear();
    }
}
