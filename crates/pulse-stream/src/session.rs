//! Stream session — the orchestrator.
//!
//! A [`StreamSession`] owns one transport connection, one frame decoder,
//! one event router, and drives the whole decode/dispatch loop on its own
//! tokio task. Sessions share no mutable state, so arbitrarily many run
//! concurrently (one per open dashboard widget).
//!
//! Within one session the loop is strictly sequential: the transport read
//! is the only suspension point, and decoding, parsing, and dispatch for a
//! received chunk happen synchronously before the next read. That sequence
//! is what guarantees event order equals chunk arrival order.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use pulse_core::buffer::RollingEventBuffer;
use pulse_core::errors::{DecodeError, StreamError, TransportError};
use pulse_core::events::{FeedEvent, SequencedEvent};
use pulse_core::ids::SessionId;

use crate::config::StreamConfig;
use crate::decoder::{FrameDecoder, Framing};
use crate::parser::{Parsed, parse_frame};
use crate::router::{EventHandlers, EventRouter, Routed};
use crate::transport::TransportChannel;

/// Lifecycle state of one stream session.
///
/// Transitions are monotonic within one session instance; a reconnect is a
/// brand-new session object, never a rewind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Created, not yet started.
    Idle,
    /// Transport connect in flight.
    Connecting,
    /// Receiving and routing events.
    Open,
    /// Teardown in progress after cancel or a terminal event.
    Closing,
    /// Torn down cleanly.
    Closed,
    /// Ended by a transport error or a producer error event.
    Failed,
}

impl SessionState {
    /// Whether no further transitions can occur.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Connecting => 1,
            Self::Open => 2,
            Self::Closing => 3,
            Self::Closed => 4,
            Self::Failed => 5,
        }
    }
}

/// Advance the state cell, enforcing monotonic forward-only transitions.
fn advance(state: &Mutex<SessionState>, to: SessionState) {
    let mut current = state.lock();
    if current.is_terminal() || to.rank() <= current.rank() {
        return;
    }
    debug!(from = ?*current, to = ?to, "session state");
    *current = to;
}

/// Handle to a running stream session.
///
/// Dropping the handle cancels the session (widget unmount semantics).
pub struct SessionHandle {
    id: SessionId,
    state: Arc<Mutex<SessionState>>,
    cancel: CancellationToken,
    finished: CancellationToken,
    buffer: Arc<Mutex<RollingEventBuffer<SequencedEvent>>>,
}

impl SessionHandle {
    /// Session id.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Cancel the session.
    ///
    /// Idempotent: calling on a session already in `Closing`, `Closed`, or
    /// `Failed` is a no-op. Unblocks a pending transport read immediately;
    /// no events are routed after that point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Snapshot of the rolling event buffer, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SequencedEvent> {
        self.buffer.lock().snapshot()
    }

    /// Resolves once the session reaches a terminal state.
    pub async fn completed(&self) {
        self.finished.cancelled().await;
    }

    /// Whether the session has reached a terminal state.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.is_cancelled()
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Factory for spawned stream sessions.
pub struct StreamSession;

impl StreamSession {
    /// Create and start a session: connect, then decode and dispatch until
    /// a terminal event, transport failure, cancel, or deadline expiry.
    #[must_use]
    pub fn spawn(
        transport: TransportChannel,
        handlers: EventHandlers,
        config: StreamConfig,
    ) -> SessionHandle {
        let id = SessionId::new();
        let state = Arc::new(Mutex::new(SessionState::Idle));
        let cancel = CancellationToken::new();
        let finished = CancellationToken::new();
        let buffer = Arc::new(Mutex::new(RollingEventBuffer::new(config.buffer_capacity)));
        let router = EventRouter::new(handlers, Arc::clone(&buffer));

        let task_state = Arc::clone(&state);
        let task_cancel = cancel.clone();
        let task_finished = finished.clone();
        let task_id = id.clone();
        drop(tokio::spawn(async move {
            run_loop(
                &task_id,
                transport,
                router,
                &task_state,
                &task_cancel,
                config,
            )
            .await;
            task_finished.cancel();
        }));

        SessionHandle {
            id,
            state,
            cancel,
            finished,
            buffer,
        }
    }
}

/// How the decode/dispatch loop ended.
enum LoopEnd {
    Cancelled,
    Completed,
    ProducerError,
    Dropped,
}

async fn run_loop(
    id: &SessionId,
    transport: TransportChannel,
    mut router: EventRouter,
    state: &Arc<Mutex<SessionState>>,
    cancel: &CancellationToken,
    config: StreamConfig,
) {
    advance(state, SessionState::Connecting);

    // A deadline is just another way to reach the cancellation path. The
    // clock starts now, so it bounds the whole session including connect.
    let deadline_ms = config.deadline_ms;
    let deadline = async move {
        match deadline_ms {
            Some(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let connect_timeout = Duration::from_millis(config.connect_timeout_ms);
    let open_fut = transport.open(connect_timeout);
    tokio::pin!(open_fut);
    let opened = loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                advance(state, SessionState::Closing);
                advance(state, SessionState::Closed);
                return;
            }
            () = &mut deadline => {
                debug!(session = %id, "deadline expired while connecting, cancelling");
                cancel.cancel();
            }
            opened = &mut open_fut => break opened,
        }
    };

    let mut chunks = match opened {
        Ok(chunks) => chunks,
        Err(e) => {
            let err = StreamError::from(e);
            warn!(session = %id, error = %err, "stream open failed");
            router.fail(&err);
            advance(state, SessionState::Failed);
            return;
        }
    };
    advance(state, SessionState::Open);

    let framing = transport.framing();
    let mut decoder = FrameDecoder::new(framing, config.max_frame_bytes);

    let end = 'read: loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => break 'read LoopEnd::Cancelled,
            () = &mut deadline => {
                debug!(session = %id, "deadline expired, cancelling");
                cancel.cancel();
                continue;
            }
            next = chunks.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                for item in decoder.feed(&chunk) {
                    if let Some(end) = handle_frame(id, item, framing, &mut router) {
                        break 'read end;
                    }
                }
            }
            Some(Err(e)) => {
                let err = StreamError::from(e);
                warn!(session = %id, error = %err, "transport error mid-stream");
                router.fail(&err);
                break 'read LoopEnd::Dropped;
            }
            None => {
                // Transport ended; a trailing partial frame may still hold
                // the terminal event.
                if let Some(item) = decoder.finish() {
                    if let Some(end) = handle_frame(id, item, framing, &mut router) {
                        break 'read end;
                    }
                }
                let err = StreamError::from(TransportError::Dropped {
                    message: "stream ended without a terminal event".into(),
                });
                warn!(session = %id, error = %err, "transport closed early");
                router.fail(&err);
                break 'read LoopEnd::Dropped;
            }
        }
    };

    match end {
        LoopEnd::Cancelled | LoopEnd::Completed => {
            advance(state, SessionState::Closing);
            advance(state, SessionState::Closed);
        }
        LoopEnd::ProducerError | LoopEnd::Dropped => {
            advance(state, SessionState::Failed);
        }
    }
}

/// Process one decoded frame; returns how the loop ends if it does.
fn handle_frame(
    id: &SessionId,
    item: Result<String, DecodeError>,
    framing: Framing,
    router: &mut EventRouter,
) -> Option<LoopEnd> {
    let frame = match item {
        Ok(frame) => frame,
        Err(e) => return absorb(id, e, router),
    };
    match parse_frame(&frame, framing) {
        Ok(Parsed::KeepAlive) => None,
        Ok(Parsed::EndOfStream) => {
            let _ = router.route(FeedEvent::Complete { text: None });
            Some(LoopEnd::Completed)
        }
        Ok(Parsed::Event(event)) => match router.route(event) {
            Routed::Continue => None,
            Routed::Complete => Some(LoopEnd::Completed),
            Routed::Failed => Some(LoopEnd::ProducerError),
        },
        Err(e) => absorb(id, e, router),
    }
}

/// Classify one frame-level error; only terminal kinds end the loop.
fn absorb(id: &SessionId, e: DecodeError, router: &mut EventRouter) -> Option<LoopEnd> {
    let err = StreamError::from(e);
    if err.is_terminal() {
        router.fail(&err);
        return Some(LoopEnd::Dropped);
    }
    warn!(session = %id, error = %err, "dropping malformed frame");
    None
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
