//! # pulse-stream
//!
//! The streaming-event client behind every live view in the pulse
//! dashboard: agent chat completions, the activity matrix, instant-analysis
//! progress, browser-automation logs, and call transcripts.
//!
//! One pipeline serves all of them:
//!
//! ```text
//! TransportChannel → raw chunks → FrameDecoder → frames → parse_frame
//!     → FeedEvents → EventRouter → callbacks + RollingEventBuffer
//! ```
//!
//! A [`session::StreamSession`] owns one transport connection end to end
//! and drives the decode/dispatch loop on its own tokio task; arbitrarily
//! many sessions run concurrently without shared state.

#![deny(unsafe_code)]

pub mod config;
pub mod decoder;
pub mod parser;
pub mod router;
pub mod session;
pub mod transport;

pub use config::StreamConfig;
pub use decoder::{Framing, FrameDecoder};
pub use parser::{Parsed, parse_frame};
pub use router::{CompletionAccumulator, EventHandlers, EventRouter, Routed};
pub use session::{SessionHandle, SessionState, StreamSession};
pub use transport::{ChunkStream, StreamEndpoint, TransportChannel};
