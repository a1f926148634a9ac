//! Text codec built on `encoding_rs`.
//!
//! Reads sniff a UTF-8 or UTF-16 byte-order mark and fall back to the
//! codec's encoding. Writes never substitute: a strict codec rejects
//! malformed input and unmappable characters.

use std::fmt;

use encoding_rs::{
    CoderResult, Decoder, DecoderResult, Encoder, EncoderResult, Encoding, UTF_8, UTF_16BE,
    UTF_16LE,
};

use crate::config::MAX_BUFFER_LEN;
use crate::error::TransferError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const UTF16LE_BOM: &[u8] = b"\xFF\xFE";
const UTF16BE_BOM: &[u8] = b"\xFE\xFF";

/// Slack reserved on top of the encoder's estimate so replacement output always fits.
const ENCODE_SLACK: usize = 16;

/// A text encoding together with BOM and validation policy.
///
/// The default codec is UTF-8 without a BOM and with strict validation.
///
/// # Example
///
/// ```
/// use wholefile::TextCodec;
///
/// let codec = TextCodec::utf8();
/// let bytes = codec.encode("héllo")?;
/// assert_eq!(codec.decode(&bytes)?, "héllo");
///
/// // A UTF-16 BOM overrides the codec's own encoding on read.
/// let (sniffed, bom_len) = codec.sniff_bom(b"\xFF\xFEh\0").unwrap();
/// assert_eq!(sniffed.name(), "UTF-16LE");
/// assert_eq!(bom_len, 2);
/// # Ok::<(), wholefile::TransferError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextCodec {
    encoding: &'static Encoding,
    emit_bom: bool,
    strict: bool,
}

impl TextCodec {
    /// UTF-8 without a BOM, strict.
    pub fn utf8() -> Self {
        Self {
            encoding: UTF_8,
            emit_bom: false,
            strict: true,
        }
    }

    /// UTF-8 that writes a BOM preamble, strict.
    pub fn utf8_with_bom() -> Self {
        Self::utf8().with_bom(true)
    }

    /// UTF-16 little endian with a BOM preamble, strict.
    pub fn utf16le() -> Self {
        Self {
            encoding: UTF_16LE,
            emit_bom: true,
            strict: true,
        }
    }

    /// UTF-16 big endian with a BOM preamble, strict.
    pub fn utf16be() -> Self {
        Self {
            encoding: UTF_16BE,
            emit_bom: true,
            strict: true,
        }
    }

    /// Looks up an encoding by its WHATWG label, e.g. `"latin1"` or `"shift_jis"`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::InvalidArgument`] if the label is unknown.
    pub fn for_label(label: &str) -> Result<Self, TransferError> {
        let encoding = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| TransferError::invalid("unknown encoding label"))?;
        Ok(Self {
            encoding,
            emit_bom: false,
            strict: true,
        })
    }

    /// Sets whether writes start with the encoding's BOM.
    ///
    /// Only UTF-8 and UTF-16 have a BOM; for other encodings this has no effect.
    pub fn with_bom(mut self, emit_bom: bool) -> Self {
        self.emit_bom = emit_bom;
        self
    }

    /// Sets strict validation. A lenient codec substitutes malformed input
    /// with U+FFFD on read and unmappable characters with numeric character
    /// references on write.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Returns the underlying encoding.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Returns the encoding name.
    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Returns whether this codec rejects malformed or unmappable input.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Detects a UTF-8 or UTF-16 BOM at the start of `bytes`.
    ///
    /// Returns the matching codec (keeping this codec's strictness) and the BOM length.
    pub fn sniff_bom(&self, bytes: &[u8]) -> Option<(TextCodec, usize)> {
        Encoding::for_bom(bytes).map(|(encoding, len)| {
            let codec = Self {
                encoding,
                emit_bom: true,
                strict: self.strict,
            };
            (codec, len)
        })
    }

    /// Bytes written before the text, or an empty slice if no BOM is emitted.
    pub fn preamble(&self) -> &'static [u8] {
        if !self.emit_bom {
            return &[];
        }
        if self.encoding == UTF_8 {
            UTF8_BOM
        } else if self.encoding == UTF_16LE {
            UTF16LE_BOM
        } else if self.encoding == UTF_16BE {
            UTF16BE_BOM
        } else {
            &[]
        }
    }

    /// Decodes a complete byte sequence, honoring a leading BOM.
    pub fn decode(&self, bytes: &[u8]) -> Result<String, TransferError> {
        let mut out = String::new();
        self.decoder().decode(bytes, true, &mut out)?;
        Ok(out)
    }

    /// Encodes a complete string. The preamble is not included.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, TransferError> {
        let mut out = Vec::new();
        self.encoder().encode(text, true, &mut out)?;
        Ok(out)
    }

    /// Creates an incremental decoder that sniffs a BOM from the first bytes.
    pub fn decoder(&self) -> TextDecoder {
        TextDecoder {
            inner: self.encoding.new_decoder(),
            strict: self.strict,
        }
    }

    /// Creates an incremental encoder.
    pub fn encoder(&self) -> TextEncoder {
        let kind = if self.encoding == UTF_16LE {
            EncoderKind::Utf16 { big_endian: false }
        } else if self.encoding == UTF_16BE {
            EncoderKind::Utf16 { big_endian: true }
        } else {
            EncoderKind::Generic(self.encoding.new_encoder())
        };
        TextEncoder {
            kind,
            name: self.encoding.name(),
            strict: self.strict,
        }
    }
}

impl Default for TextCodec {
    fn default() -> Self {
        Self::utf8()
    }
}

/// Incremental decoder. Feed consecutive byte slices, then a final call with `last = true`.
pub struct TextDecoder {
    inner: Decoder,
    strict: bool,
}

impl fmt::Debug for TextDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextDecoder")
            .field("encoding", &self.inner.encoding().name())
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

impl TextDecoder {
    /// Decodes `src` and appends the text to `dst`.
    ///
    /// Partial multi-byte sequences at the end of `src` are kept until the
    /// next call.
    pub fn decode(&mut self, src: &[u8], last: bool, dst: &mut String) -> Result<(), TransferError> {
        let mut src = src;
        loop {
            if self.strict {
                let needed = self
                    .inner
                    .max_utf8_buffer_length_without_replacement(src.len())
                    .ok_or_else(|| overflow(src.len()))?;
                dst.reserve(needed);
                let (result, read) = self
                    .inner
                    .decode_to_string_without_replacement(src, dst, last);
                src = &src[read..];
                match result {
                    DecoderResult::InputEmpty => return Ok(()),
                    DecoderResult::OutputFull => continue,
                    DecoderResult::Malformed(_, _) => {
                        return Err(TransferError::Decode {
                            encoding: self.inner.encoding().name(),
                        });
                    }
                }
            } else {
                let needed = self
                    .inner
                    .max_utf8_buffer_length(src.len())
                    .ok_or_else(|| overflow(src.len()))?;
                dst.reserve(needed);
                let (result, read, _) = self.inner.decode_to_string(src, dst, last);
                src = &src[read..];
                if let CoderResult::InputEmpty = result {
                    return Ok(());
                }
            }
        }
    }

    /// The encoding in effect. After a BOM was seen this is the sniffed encoding.
    pub fn encoding(&self) -> &'static Encoding {
        self.inner.encoding()
    }
}

enum EncoderKind {
    // encoding_rs only encodes UTF-16 input as UTF-8, so UTF-16 output is produced here
    Utf16 { big_endian: bool },
    Generic(Encoder),
}

/// Incremental encoder. Feed consecutive string slices, then a final call with `last = true`.
pub struct TextEncoder {
    kind: EncoderKind,
    name: &'static str,
    strict: bool,
}

impl fmt::Debug for TextEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextEncoder")
            .field("encoding", &self.name)
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

impl TextEncoder {
    /// Encodes `src` and appends the bytes to `dst`.
    pub fn encode(&mut self, src: &str, last: bool, dst: &mut Vec<u8>) -> Result<(), TransferError> {
        let encoder = match &mut self.kind {
            EncoderKind::Utf16 { big_endian } => {
                dst.reserve(src.len() * 2);
                for unit in src.encode_utf16() {
                    let bytes = if *big_endian {
                        unit.to_be_bytes()
                    } else {
                        unit.to_le_bytes()
                    };
                    dst.extend_from_slice(&bytes);
                }
                return Ok(());
            }
            EncoderKind::Generic(encoder) => encoder,
        };

        let mut src = src;
        loop {
            if self.strict {
                let needed = encoder
                    .max_buffer_length_from_utf8_without_replacement(src.len())
                    .ok_or_else(|| overflow(src.len()))?;
                dst.reserve(needed);
                let (result, read) =
                    encoder.encode_from_utf8_to_vec_without_replacement(src, dst, last);
                src = &src[read..];
                match result {
                    EncoderResult::InputEmpty => return Ok(()),
                    EncoderResult::OutputFull => continue,
                    EncoderResult::Unmappable(character) => {
                        return Err(TransferError::Encode {
                            encoding: self.name,
                            character,
                        });
                    }
                }
            } else {
                let needed = encoder
                    .max_buffer_length_from_utf8_if_no_unmappables(src.len())
                    .ok_or_else(|| overflow(src.len()))?;
                dst.reserve(needed + ENCODE_SLACK);
                let (result, read, _) = encoder.encode_from_utf8_to_vec(src, dst, last);
                src = &src[read..];
                if let CoderResult::InputEmpty = result {
                    return Ok(());
                }
            }
        }
    }
}

fn overflow(len: usize) -> TransferError {
    TransferError::CapacityExceeded {
        requested: len,
        max: MAX_BUFFER_LEN,
    }
}
