//! Line reassembly for the upstream byte stream.

use crate::core::error::DomainError;

/// Longest line accepted before the stream is treated as malformed.
pub const DEFAULT_MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Accumulates raw bytes and yields complete, non-empty lines.
///
/// Network reads may split a line anywhere, including inside a multi-byte
/// UTF-8 sequence. Bytes are only decoded once a full line is available.
/// Each byte is scanned for a newline once, however the input is split.
#[derive(Debug)]
pub struct LineDecoder {
    pending: Vec<u8>,
    /// Prefix of `pending` already known to hold no newline.
    scanned: usize,
    max_line: usize,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::with_max_line(DEFAULT_MAX_LINE_BYTES)
    }
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            pending: Vec::new(),
            scanned: 0,
            max_line,
        }
    }

    /// Feed a chunk of bytes, returning every line it completes.
    ///
    /// Fails once the unterminated tail grows past the line limit; the
    /// buffered bytes are discarded.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, DomainError> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut cursor = self.scanned;
        while let Some(offset) = self.pending[cursor..].iter().position(|&b| b == b'\n') {
            let end = cursor + offset;
            if let Some(decoded) = decode_line(&self.pending[start..end]) {
                lines.push(decoded);
            }
            start = end + 1;
            cursor = start;
        }
        self.pending.drain(..start);
        self.scanned = self.pending.len();

        if self.pending.len() > self.max_line {
            self.pending.clear();
            self.scanned = 0;
            return Err(DomainError::LineTooLong {
                limit: self.max_line,
            });
        }
        Ok(lines)
    }

    /// Flush a trailing line that was never terminated.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        self.scanned = 0;
        decode_line(&rest)
    }

    /// Number of buffered bytes not yet forming a line.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn decode_line(bytes: &[u8]) -> Option<String> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    Some(String::from_utf8_lossy(bytes).into_owned())
}
