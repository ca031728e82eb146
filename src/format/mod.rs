//! Session-file container formats
//!
//! Firefox persists session state in one of two containers:
//! - plain UTF-8 JSON text (`sessionstore.js`, `recovery.js`)
//! - an 8-byte `mozLz40\0` magic header followed by an lz4 block with a
//!   prepended little-endian u32 decompressed size (`recovery.jsonlz4`)
//!
//! Decoding fails fast on a bad magic header or malformed JSON; no partial
//! data is ever returned. Encoding produces compact, ASCII-escaped JSON so
//! that rewritten files diff cleanly against what the browser itself writes.

use std::io;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::error::SessionError;

/// Magic prefix of lz4-compressed session files
pub const MOZLZ4_MAGIC: &[u8; 8] = b"mozLz40\0";

/// On-disk container format of a session file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFormat {
    /// Compact UTF-8 JSON text
    PlainJson,
    /// `mozLz40\0` magic followed by a size-prepended lz4 block
    CompressedJson,
}

impl SessionFormat {
    /// Detect the container format from raw file content
    pub fn sniff(bytes: &[u8]) -> SessionFormat {
        if bytes.starts_with(MOZLZ4_MAGIC) {
            SessionFormat::CompressedJson
        } else {
            SessionFormat::PlainJson
        }
    }

    /// Guess the container format from a file name
    pub fn from_path(path: &Path) -> SessionFormat {
        match path.extension().and_then(|e| e.to_str()) {
            Some("jsonlz4") | Some("baklz4") => SessionFormat::CompressedJson,
            _ => SessionFormat::PlainJson,
        }
    }

    /// Whether this build can decode and encode the format
    pub fn available(&self) -> bool {
        match self {
            SessionFormat::PlainJson => true,
            SessionFormat::CompressedJson => cfg!(feature = "lz4"),
        }
    }

    /// Decode raw file content into a JSON document
    ///
    /// `path` is only used for error messages.
    pub fn decode(&self, path: &Path, bytes: &[u8]) -> Result<Value, SessionError> {
        match self {
            SessionFormat::PlainJson => parse_json(path, bytes),
            SessionFormat::CompressedJson => {
                let body = bytes.strip_prefix(MOZLZ4_MAGIC).ok_or_else(|| {
                    SessionError::format(path, "missing mozLz40 magic header")
                })?;
                let raw = decompress(path, body)?;
                parse_json(path, &raw)
            }
        }
    }

    /// Encode a JSON document into raw file content
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, SessionError> {
        let json = to_ascii_json(value)?;
        match self {
            SessionFormat::PlainJson => Ok(json),
            SessionFormat::CompressedJson => compress(&json),
        }
    }
}

fn parse_json(path: &Path, bytes: &[u8]) -> Result<Value, SessionError> {
    serde_json::from_slice(bytes).map_err(|e| SessionError::format(path, e.to_string()))
}

#[cfg(feature = "lz4")]
fn decompress(path: &Path, body: &[u8]) -> Result<Vec<u8>, SessionError> {
    lz4_flex::block::decompress_size_prepended(body)
        .map_err(|e| SessionError::format(path, format!("lz4 decompression failed: {}", e)))
}

#[cfg(not(feature = "lz4"))]
fn decompress(_path: &Path, _body: &[u8]) -> Result<Vec<u8>, SessionError> {
    Err(lz4_unavailable())
}

#[cfg(feature = "lz4")]
fn compress(json: &[u8]) -> Result<Vec<u8>, SessionError> {
    let mut out = Vec::with_capacity(MOZLZ4_MAGIC.len() + json.len() / 2);
    out.extend_from_slice(MOZLZ4_MAGIC);
    out.extend_from_slice(&lz4_flex::block::compress_prepend_size(json));
    Ok(out)
}

#[cfg(not(feature = "lz4"))]
fn compress(_json: &[u8]) -> Result<Vec<u8>, SessionError> {
    Err(lz4_unavailable())
}

#[cfg(not(feature = "lz4"))]
fn lz4_unavailable() -> SessionError {
    SessionError::Configuration(
        "session file is lz4-compressed but this build has no lz4 support \
         (rebuild with the `lz4` feature)"
            .to_string(),
    )
}

/// Serialize as compact JSON with every non-ASCII character escaped
///
/// Matches the browser's own serialization: no whitespace between tokens,
/// `\uXXXX` escapes (surrogate pairs for astral characters) for everything
/// above U+007F. Key order is the document's own, so an unmodified field
/// re-serializes to the same bytes.
pub fn to_ascii_json(value: &Value) -> Result<Vec<u8>, SessionError> {
    let mut out = Vec::with_capacity(128);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, AsciiFormatter);
    value
        .serialize(&mut ser)
        .map_err(|e| SessionError::format("<memory>", e.to_string()))?;
    Ok(out)
}

/// Compact formatter that `\u`-escapes non-ASCII string content
struct AsciiFormatter;

impl serde_json::ser::Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            if ch.is_ascii() {
                continue;
            }
            if start < i {
                writer.write_all(fragment[start..i].as_bytes())?;
            }
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}
