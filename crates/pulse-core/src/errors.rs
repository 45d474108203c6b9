//! Error hierarchy for the streaming subsystem.
//!
//! Built on [`thiserror`]:
//!
//! - [`TransportError`]: connection-level failures — the only terminal kind.
//!   Moves a session to `Failed` and is reported via the error callback.
//! - [`DecodeError`]: one malformed frame. Non-terminal: the frame is
//!   discarded with a diagnostic and the loop continues.
//! - [`ProtocolError`]: a recognized but unexpected event for the current
//!   consumer. Logged and ignored, never terminal.
//! - [`StreamError`]: top-level enum covering all of the above.
//!
//! Cancellation is deliberately not represented here: an explicit
//! `cancel()` (or deadline expiry) ends a session cleanly through
//! `Closing` → `Closed` and is never surfaced as a failure.

use thiserror::Error;

/// Connection-level failure. Terminal for the owning session.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request or body read failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stream endpoint answered with a non-success status at open time.
    #[error("stream open rejected with status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// WebSocket connect or read failed.
    #[error("socket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Connection dropped mid-stream without a terminal event.
    #[error("connection dropped: {message}")]
    Dropped {
        /// Description of the drop.
        message: String,
    },

    /// Connect attempt did not complete within the configured timeout.
    #[error("connect timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured connect timeout.
        timeout_ms: u64,
    },
}

/// One malformed frame. The frame is discarded; the stream continues.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Frame bytes are not valid UTF-8.
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,

    /// Frame payload is not valid JSON.
    #[error("invalid JSON in frame: {message}")]
    Json {
        /// Parser error description.
        message: String,
    },

    /// JSON parsed but matches no known event kind or shape.
    #[error("unrecognizable event shape")]
    UnknownShape,

    /// The partial buffer grew past the configured bound with no delimiter.
    #[error("frame exceeded {max_bytes} bytes without a delimiter")]
    Oversized {
        /// Configured frame size bound.
        max_bytes: usize,
    },
}

/// A recognized but unexpected event for the current consumer.
#[derive(Debug, Error)]
#[error("unexpected {kind} event: {message}")]
pub struct ProtocolError {
    /// Event kind that was unexpected.
    pub kind: String,
    /// Why it was unexpected.
    pub message: String,
}

/// Top-level error type for the streaming subsystem.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Connection-level failure (terminal).
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Per-frame decode failure (non-terminal).
    #[error("{0}")]
    Decode(#[from] DecodeError),

    /// Unexpected-but-recognized event (non-terminal).
    #[error("{0}")]
    Protocol(#[from] ProtocolError),
}

impl StreamError {
    /// Whether this error terminates its session.
    ///
    /// Only transport errors change session state to `Failed`; everything
    /// else is absorbed locally and the stream continues.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn transport_is_terminal() {
        let err = StreamError::from(TransportError::Status { status: 503 });
        assert!(err.is_terminal());
    }

    #[test]
    fn decode_is_not_terminal() {
        let err = StreamError::from(DecodeError::Json {
            message: "expected value".into(),
        });
        assert!(!err.is_terminal());
    }

    #[test]
    fn protocol_is_not_terminal() {
        let err = StreamError::from(ProtocolError {
            kind: "discovery".into(),
            message: "not expected on a chat stream".into(),
        });
        assert!(!err.is_terminal());
    }

    #[test]
    fn status_error_display() {
        let err = TransportError::Status { status: 404 };
        assert_eq!(err.to_string(), "stream open rejected with status 404");
    }

    #[test]
    fn oversized_display_names_bound() {
        let err = DecodeError::Oversized { max_bytes: 65536 };
        assert!(err.to_string().contains("65536"));
    }

    #[test]
    fn stream_error_from_decode() {
        let err: StreamError = DecodeError::InvalidUtf8.into();
        assert_matches!(err, StreamError::Decode(DecodeError::InvalidUtf8));
    }
}
