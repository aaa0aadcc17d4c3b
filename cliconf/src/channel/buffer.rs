//! Output buffer with ANSI stripping and tail search.
//!
//! Prompts only ever appear at the end of the accumulated output, so pattern
//! checks look at the last `search_depth` bytes instead of the whole buffer.
//! For large outputs (full running configs) this keeps repeated speculative
//! matching cheap.

use std::fmt;

use bytes::BytesMut;
use log::trace;
use regex::bytes::Regex;
use vte::{Parser, Perform};

/// Collects printable output from the vte parser, dropping escape sequences.
#[derive(Default)]
struct Printable {
    out: Vec<u8>,
}

impl Perform for Printable {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.out
            .extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        // Keep line structure; other C0 controls (bell, backspace) are noise.
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.out.push(byte);
        }
    }
}

/// Buffer for accumulating device output and searching its tail.
///
/// The vte parser lives as long as the buffer so an escape sequence split
/// across two reads is still removed.
pub struct PatternBuffer {
    buffer: BytesMut,
    parser: Parser,
    search_depth: usize,
}

impl PatternBuffer {
    /// Create a new pattern buffer searching the last `search_depth` bytes.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            parser: Parser::new(),
            search_depth,
        }
    }

    /// Extend the buffer with new data, stripping ANSI escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        let mut printable = Printable::default();
        self.parser.advance(&mut printable, data);
        trace!(
            "buffer: +{} bytes ({} after stripping), total {}",
            data.len(),
            printable.out.len(),
            self.buffer.len() + printable.out.len()
        );
        self.buffer.extend_from_slice(&printable.out);
    }

    /// The last `search_depth` bytes of the buffer.
    pub fn tail(&self) -> &[u8] {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        &self.buffer[start..]
    }

    /// Bytes from `offset` to the end, clamped to the tail window.
    pub fn tail_from(&self, offset: usize) -> &[u8] {
        let start = self
            .buffer
            .len()
            .saturating_sub(self.search_depth)
            .max(offset.min(self.buffer.len()));
        &self.buffer[start..]
    }

    /// Check if the tail contains a pattern match.
    pub fn tail_contains(&self, pattern: &Regex) -> bool {
        pattern.is_match(self.tail())
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the buffer contents as a string (lossy UTF-8 conversion).
    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Get the search depth setting.
    pub fn search_depth(&self) -> usize {
        self.search_depth
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl fmt::Debug for PatternBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternBuffer")
            .field("len", &self.buffer.len())
            .field("search_depth", &self.search_depth)
            .finish()
    }
}
