//! Incremental frame decoder.
//!
//! Turns raw byte chunks into complete text frames, buffering any trailing
//! partial frame until more bytes arrive. The buffer holds raw bytes and
//! frames are only decoded to UTF-8 once their delimiter has been fully
//! observed, so a chunk boundary never has to align with a character
//! boundary.
//!
//! One decoder instance is exclusively owned by one stream session. There
//! is no global per-session buffer map to clean up.

use bytes::BytesMut;
use pulse_core::errors::DecodeError;

/// How frame boundaries are recognized on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Framing {
    /// Frames end at a blank line (`\n\n`, tolerating `\r\n\r\n`).
    /// Used by the long-lived HTTP response body wire format.
    BlankLine,
    /// Every chunk is one complete frame. Used by the push-socket wire
    /// format, where each message is a whole JSON object.
    WholeChunk,
}

/// Incremental chunk-to-frame decoder.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: BytesMut,
    framing: Framing,
    max_frame_bytes: usize,
}

impl FrameDecoder {
    /// Create a decoder for the given framing mode.
    #[must_use]
    pub fn new(framing: Framing, max_frame_bytes: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            framing,
            max_frame_bytes,
        }
    }

    /// Feed one raw chunk; returns all frames completed by it.
    ///
    /// A single call may complete zero, one, or many frames. Each returned
    /// item is either a decoded frame or the [`DecodeError`] that consumed
    /// it (invalid UTF-8, or an oversized partial buffer that was cleared).
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Result<String, DecodeError>> {
        match self.framing {
            Framing::WholeChunk => {
                if chunk.is_empty() {
                    Vec::new()
                } else {
                    vec![decode_frame(chunk.to_vec())]
                }
            }
            Framing::BlankLine => {
                self.buffer.extend_from_slice(chunk);
                let mut out = Vec::new();
                while let Some((at, len)) = find_delimiter(&self.buffer) {
                    let frame = self.buffer.split_to(at + len);
                    let frame = &frame[..at];
                    // Consecutive delimiters produce empty frames; skip them.
                    if !frame.is_empty() {
                        out.push(decode_frame(frame.to_vec()));
                    }
                }
                if self.buffer.len() > self.max_frame_bytes {
                    self.buffer.clear();
                    out.push(Err(DecodeError::Oversized {
                        max_bytes: self.max_frame_bytes,
                    }));
                }
                out
            }
        }
    }

    /// Flush a trailing partial frame after the transport ends.
    ///
    /// Some producers omit the final delimiter; the last frame would
    /// otherwise be lost.
    pub fn finish(&mut self) -> Option<Result<String, DecodeError>> {
        if self.framing == Framing::WholeChunk || self.buffer.is_empty() {
            return None;
        }
        let rest = self.buffer.split();
        if rest.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        Some(decode_frame(rest.to_vec()))
    }

    /// Bytes currently held as an incomplete frame.
    #[must_use]
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }
}

fn decode_frame(bytes: Vec<u8>) -> Result<String, DecodeError> {
    String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
}

/// Find the earliest blank-line delimiter; returns (offset, delimiter length).
fn find_delimiter(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = find_subsequence(buf, b"\n\n").map(|at| (at, 2));
    let crlf = find_subsequence(buf, b"\r\n\r\n").map(|at| (at, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (found, None) | (None, found) => found,
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
