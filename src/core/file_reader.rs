//! Source file decoding
//!
//! Digests are always taken over raw bytes; this module only decides what
//! text the summarizer gets to see. Non-UTF-8 content is decoded lossily
//! instead of failing the file.

use std::fs;
use std::io::Read;
use std::path::Path;

/// How many leading bytes are inspected for NUL when sniffing binaries
const BINARY_SNIFF_LEN: usize = 8192;

/// Decoded view of a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub text: String,

    /// Invalid UTF-8 sequences were replaced
    pub lossy: bool,

    /// The content looks binary (NUL bytes near the start)
    pub binary: bool,
}

impl SourceText {
    pub fn decode(bytes: &[u8]) -> Self {
        let check_len = bytes.len().min(BINARY_SNIFF_LEN);
        let binary = bytes[..check_len].contains(&0);

        match std::str::from_utf8(bytes) {
            Ok(text) => Self {
                text: text.to_string(),
                lossy: false,
                binary,
            },
            Err(_) => Self {
                text: String::from_utf8_lossy(bytes).into_owned(),
                lossy: true,
                binary,
            },
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Read a whole file as bytes
pub fn read_bytes(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = fs::File::open(path)?;
    let len = file.metadata().map(|m| m.len() as usize).unwrap_or(0);
    let mut buffer = Vec::with_capacity(len);
    std::io::BufReader::new(file).read_to_end(&mut buffer)?;
    Ok(buffer)
}

/// Truncate string at a valid UTF-8 character boundary
pub fn truncate_at_char_boundary(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }

    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    &s[..end]
}
