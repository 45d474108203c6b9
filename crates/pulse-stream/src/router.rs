//! Event routing and completion accumulation.
//!
//! The router owns the per-session completion accumulator and the rolling
//! event buffer. Every routed event lands in the buffer regardless of kind,
//! so consumers that poll the buffer see everything; callback dispatch is
//! per kind on top of that.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use pulse_core::buffer::RollingEventBuffer;
use pulse_core::errors::{ProtocolError, StreamError};
use pulse_core::events::{FeedEvent, SequencedEvent};
use tracing::debug;

/// Callback invoked with each token delta.
pub type TokenCallback = Box<dyn FnMut(&str) + Send>;
/// Callback invoked once with the final accumulated text.
pub type CompleteCallback = Box<dyn FnMut(String) + Send>;
/// Callback invoked with a terminal error message (wire error event or
/// transport failure).
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;
/// Callback invoked with a non-completion event of one registered kind.
pub type EventCallback = Box<dyn FnMut(&FeedEvent) + Send>;

/// Registered consumer callbacks for one session.
///
/// All callbacks are optional; a consumer that only polls the rolling
/// buffer registers none. Callbacks are expected to be cheap (enqueue into
/// UI state) — the dispatch loop runs them inline.
#[derive(Default)]
pub struct EventHandlers {
    token: Option<TokenCallback>,
    complete: Option<CompleteCallback>,
    error: Option<ErrorCallback>,
    per_kind: HashMap<&'static str, EventCallback>,
}

impl EventHandlers {
    /// No callbacks registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the token-delta callback.
    #[must_use]
    pub fn on_token(mut self, f: impl FnMut(&str) + Send + 'static) -> Self {
        self.token = Some(Box::new(f));
        self
    }

    /// Register the completion callback.
    #[must_use]
    pub fn on_complete(mut self, f: impl FnMut(String) + Send + 'static) -> Self {
        self.complete = Some(Box::new(f));
        self
    }

    /// Register the error callback.
    #[must_use]
    pub fn on_error(mut self, f: impl FnMut(&str) + Send + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    /// Register a callback for one event kind (e.g. `"progress"`).
    ///
    /// Kinds with no registered callback are ignored, not errors.
    #[must_use]
    pub fn on_kind(
        mut self,
        kind: &'static str,
        f: impl FnMut(&FeedEvent) + Send + 'static,
    ) -> Self {
        let _ = self.per_kind.insert(kind, Box::new(f));
        self
    }
}

/// Running concatenation of token deltas into final text.
#[derive(Debug, Default)]
pub struct CompletionAccumulator {
    text: String,
    tokens: u64,
}

impl CompletionAccumulator {
    /// Empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one delta.
    pub fn push(&mut self, delta: &str) {
        self.text.push_str(delta);
        self.tokens += 1;
    }

    /// Number of deltas accumulated.
    #[must_use]
    pub fn token_count(&self) -> u64 {
        self.tokens
    }

    /// Current accumulated text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Take the final text, leaving the accumulator reset.
    #[must_use]
    pub fn finalize(&mut self) -> String {
        self.tokens = 0;
        std::mem::take(&mut self.text)
    }
}

/// What the session loop should do after routing one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Routed {
    /// Keep reading.
    Continue,
    /// Terminal `complete` — tear down cleanly.
    Complete,
    /// Terminal `error` — the session is failed.
    Failed,
}

/// Dispatches each event to the right handler and records it.
pub struct EventRouter {
    handlers: EventHandlers,
    accumulator: CompletionAccumulator,
    buffer: Arc<Mutex<RollingEventBuffer<SequencedEvent>>>,
    next_seq: u64,
}

impl EventRouter {
    /// Create a router over the session's shared buffer.
    #[must_use]
    pub fn new(
        handlers: EventHandlers,
        buffer: Arc<Mutex<RollingEventBuffer<SequencedEvent>>>,
    ) -> Self {
        Self {
            handlers,
            accumulator: CompletionAccumulator::new(),
            buffer,
            next_seq: 0,
        }
    }

    /// Route one event.
    pub fn route(&mut self, event: FeedEvent) -> Routed {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.buffer.lock().push(SequencedEvent {
            seq,
            event: event.clone(),
        });

        match &event {
            FeedEvent::TokenDelta { token } => {
                self.accumulator.push(token);
                if let Some(f) = self.handlers.token.as_mut() {
                    f(token);
                }
                Routed::Continue
            }
            FeedEvent::Complete { text } => {
                // A producer-supplied final text is authoritative; otherwise
                // the accumulator's concatenation stands in.
                let final_text = match text {
                    Some(t) => t.clone(),
                    None => self.accumulator.finalize(),
                };
                if let Some(f) = self.handlers.complete.as_mut() {
                    f(final_text);
                }
                Routed::Complete
            }
            FeedEvent::Error { error } => {
                if let Some(f) = self.handlers.error.as_mut() {
                    f(error);
                }
                Routed::Failed
            }
            other => {
                if let Some(f) = self.handlers.per_kind.get_mut(other.kind()) {
                    f(other);
                } else {
                    let ignored = ProtocolError {
                        kind: other.kind().to_owned(),
                        message: "no handler registered".into(),
                    };
                    debug!(error = %ignored, "ignoring event");
                }
                Routed::Continue
            }
        }
    }

    /// Report a terminal stream failure through the error callback.
    pub fn fail(&mut self, error: &StreamError) {
        if let Some(f) = self.handlers.error.as_mut() {
            f(&error.to_string());
        }
    }

    /// Token deltas routed so far.
    #[must_use]
    pub fn token_count(&self) -> u64 {
        self.accumulator.token_count()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
