//! Feed event types for live dashboard streams.
//!
//! A [`FeedEvent`] is one typed, application-level message decoded from one
//! wire frame. Every streaming feature in the dashboard (agent chat, live
//! activity matrix, instant analysis, browser log, call transcript) consumes
//! the same enum; widgets simply ignore kinds they do not render.
//!
//! Events are transient and never persisted — the only history is the
//! bounded [`RollingEventBuffer`](crate::buffer::RollingEventBuffer).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events emitted by a stream session.
///
/// Serialized with an explicit `event` tag. Producers that omit the tag are
/// handled by shape inference in the parser, not here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum FeedEvent {
    /// Incremental completion text.
    #[serde(rename = "token_delta")]
    TokenDelta {
        /// Text fragment.
        token: String,
    },

    /// Multi-step analysis progress update.
    #[serde(rename = "progress")]
    Progress {
        /// Name of the current step.
        #[serde(skip_serializing_if = "Option::is_none")]
        stage: Option<String>,
        /// Completion percentage (0–100).
        #[serde(skip_serializing_if = "Option::is_none")]
        percent: Option<f64>,
        /// Human-readable progress text.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Something found during analysis (e.g. a competitor).
    #[serde(rename = "discovery")]
    Discovery {
        /// Short display label.
        label: String,
        /// Arbitrary structured detail.
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<Value>,
    },

    /// An analysis insight.
    #[serde(rename = "insight")]
    Insight {
        /// Insight text.
        text: String,
    },

    /// Stream completed successfully.
    #[serde(rename = "complete")]
    Complete {
        /// Final full text, when the producer supplies it. When absent the
        /// router substitutes the completion accumulator's concatenation.
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },

    /// Stream-level error reported by the producer.
    #[serde(rename = "error")]
    Error {
        /// Error message.
        error: String,
    },

    /// One line of a live log feed.
    #[serde(rename = "log_line")]
    LogLine {
        /// Log text.
        line: String,
        /// Severity label, when the producer tags one.
        #[serde(skip_serializing_if = "Option::is_none")]
        level: Option<String>,
    },

    /// Resource status transition (e.g. call ringing → connected).
    #[serde(rename = "status_change")]
    StatusChange {
        /// New status value.
        status: String,
    },
}

impl FeedEvent {
    /// Wire kind string for this event.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TokenDelta { .. } => "token_delta",
            Self::Progress { .. } => "progress",
            Self::Discovery { .. } => "discovery",
            Self::Insight { .. } => "insight",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
            Self::LogLine { .. } => "log_line",
            Self::StatusChange { .. } => "status_change",
        }
    }

    /// Whether this event ends the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

/// A routed event paired with its arrival sequence number.
///
/// Sequence numbers are assigned by the router, monotonically increasing
/// per session, in frame arrival order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequencedEvent {
    /// Arrival position within the session (0-based).
    pub seq: u64,
    /// The event.
    #[serde(flatten)]
    pub event: FeedEvent,
}

/// All recognized feed event kind strings.
pub const FEED_EVENT_KINDS: &[&str] = &[
    "token_delta",
    "progress",
    "discovery",
    "insight",
    "complete",
    "error",
    "log_line",
    "status_change",
];

/// Check if a kind string names a feed event kind.
#[must_use]
pub fn is_feed_event_kind(kind: &str) -> bool {
    FEED_EVENT_KINDS.contains(&kind)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
