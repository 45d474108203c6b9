//! Frame-to-event parser.
//!
//! Interprets one complete frame as a [`FeedEvent`]. A malformed frame
//! yields a [`DecodeError`] the caller logs and discards — one bad frame
//! never terminates the stream.
//!
//! The two wire formats differ above the frame level too:
//!
//! - Blank-line frames carry `data: `-prefixed payload lines; comment and
//!   non-data field lines are ignored; the literal `[DONE]` payload is the
//!   end-of-stream sentinel and never reaches the JSON parser.
//! - Whole-chunk frames are one JSON object each; the reserved no-op
//!   payload (`{"event":"ping"}` or a bare `{}`) is a keep-alive.
//!
//! Kind discrimination reads the explicit `event` tag when present (the
//! legacy `type` tag is accepted as an alias); producers that omit the tag
//! are handled by payload-shape inference.

use pulse_core::errors::DecodeError;
use pulse_core::events::{FeedEvent, is_feed_event_kind};
use serde_json::Value;
use tracing::debug;

use crate::decoder::Framing;

/// End-of-stream sentinel payload.
const DONE_SENTINEL: &str = "[DONE]";

/// Payload line marker for blank-line framing.
const DATA_MARKER: &str = "data:";

/// Outcome of parsing one frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Parsed {
    /// A routable event.
    Event(FeedEvent),
    /// The producer signalled end-of-stream explicitly.
    EndOfStream,
    /// Nothing routable in this frame (keep-alive, comments only).
    KeepAlive,
}

/// Parse one frame's text into a [`Parsed`] outcome.
pub fn parse_frame(frame: &str, framing: Framing) -> Result<Parsed, DecodeError> {
    let payload = match framing {
        Framing::BlankLine => match extract_data(frame) {
            Some(data) => data,
            None => return Ok(Parsed::KeepAlive),
        },
        Framing::WholeChunk => frame.trim().to_string(),
    };

    if payload.is_empty() {
        return Ok(Parsed::KeepAlive);
    }
    if payload == DONE_SENTINEL {
        return Ok(Parsed::EndOfStream);
    }

    let value: Value = serde_json::from_str(&payload).map_err(|e| DecodeError::Json {
        message: e.to_string(),
    })?;
    parse_payload(value)
}

/// Extract the data payload from a blank-line frame.
///
/// Joins multiple `data:` lines with `\n`. Returns `None` when the frame
/// holds no data lines at all (comments, `event:`/`id:` fields, blanks) —
/// those frames are ignored rather than erroring.
fn extract_data(frame: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for line in frame.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(data) = line.strip_prefix(DATA_MARKER) {
            let data = data.trim();
            if !data.is_empty() {
                parts.push(data);
            }
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

/// Turn a parsed JSON payload into an event.
fn parse_payload(value: Value) -> Result<Parsed, DecodeError> {
    let tag = value
        .get("event")
        .or_else(|| value.get("type"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    if let Some(tag) = tag {
        if tag == "ping" {
            return Ok(Parsed::KeepAlive);
        }
        if !is_feed_event_kind(&tag) {
            debug!(kind = %tag, "unrecognized event tag");
            return Err(DecodeError::UnknownShape);
        }
        // Normalize the legacy `type` tag so serde sees the canonical one.
        let mut normalized = value;
        if let Some(obj) = normalized.as_object_mut() {
            let _ = obj.remove("type");
            let _ = obj.insert("event".into(), Value::String(tag));
        }
        let event: FeedEvent =
            serde_json::from_value(normalized).map_err(|e| DecodeError::Json {
                message: e.to_string(),
            })?;
        return Ok(Parsed::Event(event));
    }

    infer_event(&value)
}

/// Shape-based kind inference for untagged legacy producers.
fn infer_event(value: &Value) -> Result<Parsed, DecodeError> {
    let Some(obj) = value.as_object() else {
        return Err(DecodeError::UnknownShape);
    };

    if let Some(token) = obj.get("token").and_then(Value::as_str) {
        return Ok(Parsed::Event(FeedEvent::TokenDelta {
            token: token.to_owned(),
        }));
    }
    if obj.get("done").and_then(Value::as_bool) == Some(true) {
        return Ok(Parsed::Event(FeedEvent::Complete {
            text: obj.get("text").and_then(Value::as_str).map(str::to_owned),
        }));
    }
    if let Some(error) = obj.get("error").and_then(Value::as_str) {
        return Ok(Parsed::Event(FeedEvent::Error {
            error: error.to_owned(),
        }));
    }
    if obj.contains_key("percent") || obj.contains_key("progress") || obj.contains_key("stage") {
        let percent = obj
            .get("percent")
            .or_else(|| obj.get("progress"))
            .and_then(Value::as_f64);
        return Ok(Parsed::Event(FeedEvent::Progress {
            stage: obj.get("stage").and_then(Value::as_str).map(str::to_owned),
            percent,
            message: obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned),
        }));
    }
    if let Some(label) = obj
        .get("competitor")
        .or_else(|| obj.get("label"))
        .and_then(Value::as_str)
    {
        return Ok(Parsed::Event(FeedEvent::Discovery {
            label: label.to_owned(),
            detail: obj.get("detail").cloned(),
        }));
    }
    if let Some(text) = obj.get("insight").and_then(Value::as_str) {
        return Ok(Parsed::Event(FeedEvent::Insight {
            text: text.to_owned(),
        }));
    }
    if let Some(line) = obj.get("line").and_then(Value::as_str) {
        return Ok(Parsed::Event(FeedEvent::LogLine {
            line: line.to_owned(),
            level: obj.get("level").and_then(Value::as_str).map(str::to_owned),
        }));
    }
    if let Some(status) = obj.get("status").and_then(Value::as_str) {
        return Ok(Parsed::Event(FeedEvent::StatusChange {
            status: status.to_owned(),
        }));
    }

    if obj.is_empty() {
        // Bare `{}` arrives from some producers as a keep-alive.
        return Ok(Parsed::KeepAlive);
    }
    Err(DecodeError::UnknownShape)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
