//! Line Decoder
//!
//! Synchronous state machine that turns arbitrarily split bytes into
//! `data: ` frames.
//!
//! # Wire Format
//!
//! ```text
//! data: {"content":"Hel","is_complete":false,"model":"qwen3"}\n
//! \n
//! data: {"content":"lo","is_complete":true,"model":"qwen3"}\n
//! \n
//! data: [DONE]\n
//! ```
//!
//! Lines that do not start with `data: ` are ignored. Lines are split on the
//! `\n` byte before any UTF-8 decoding happens; that byte never occurs inside
//! a multi-byte sequence, so a code point split across two reads is simply
//! carried in the pending buffer until its line completes.

use crate::backend::StreamChunk;

/// Prefix that marks a frame line
pub const DATA_PREFIX: &str = "data: ";

/// Payload that marks the clean end of a stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// Minimum buffer capacity for the decoder
const MIN_BUFFER_CAPACITY: usize = 4096;

/// One decoded frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SseFrame {
    /// A chunk of response content
    Chunk(StreamChunk),
    /// The end-of-stream sentinel
    Done,
}

/// Decoder state machine for streaming line parsing
///
/// Buffers incoming bytes and yields complete frames.
#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Position where we've consumed up to
    read_pos: usize,
    /// Input has ended; the residual line may be decoded without a newline
    input_closed: bool,
    /// Frames skipped because their payload was malformed
    skipped: u64,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SseDecoder {
    /// Create a new decoder with default buffer capacity
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MIN_BUFFER_CAPACITY),
            read_pos: 0,
            input_closed: false,
            skipped: 0,
        }
    }

    /// Append bytes to the buffer
    pub fn push(&mut self, data: &[u8]) {
        // Compact buffer if we've consumed a lot
        if self.read_pos > self.buffer.len() / 2 && self.read_pos > MIN_BUFFER_CAPACITY {
            self.buffer.drain(..self.read_pos);
            self.read_pos = 0;
        }
        self.buffer.extend_from_slice(data);
    }

    /// Signal that no more bytes will arrive
    ///
    /// Afterwards a trailing line without `\n` is decoded like any other.
    pub fn close(&mut self) {
        self.input_closed = true;
    }

    /// Get the number of bytes not yet consumed
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len() - self.read_pos
    }

    /// Number of malformed frames skipped so far
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Take the next complete line out of the buffer
    fn next_line(&mut self) -> Option<String> {
        let rest = &self.buffer[self.read_pos..];
        let (line_end, consumed) = match rest.iter().position(|&b| b == b'\n') {
            Some(pos) => (pos, pos + 1),
            None if self.input_closed && !rest.is_empty() => (rest.len(), rest.len()),
            None => return None,
        };

        let mut line = &rest[..line_end];
        if line.last() == Some(&b'\r') {
            line = &line[..line.len() - 1];
        }
        let text = String::from_utf8_lossy(line).into_owned();
        self.read_pos += consumed;
        Some(text)
    }

    /// Try to decode the next frame
    ///
    /// Returns `None` when more bytes are needed. Non-frame lines and frames
    /// with a malformed payload are consumed and skipped.
    pub fn next_frame(&mut self) -> Option<SseFrame> {
        while let Some(line) = self.next_line() {
            let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
                continue;
            };
            let payload = payload.trim();

            if payload == DONE_SENTINEL {
                return Some(SseFrame::Done);
            }

            match serde_json::from_str::<StreamChunk>(payload) {
                Ok(chunk) => return Some(SseFrame::Chunk(chunk)),
                Err(e) => {
                    self.skipped += 1;
                    tracing::warn!(error = %e, payload = %payload, "Skipping malformed stream frame");
                }
            }
        }
        None
    }

    /// Drop everything buffered
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.read_pos = 0;
    }
}
