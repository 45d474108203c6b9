//! Stream session configuration.

use serde::{Deserialize, Serialize};

/// Configuration for one stream session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Rolling event buffer capacity (default `50`).
    pub buffer_capacity: usize,
    /// Connect timeout in milliseconds (default `10_000`).
    pub connect_timeout_ms: u64,
    /// Optional session deadline in milliseconds, measured from `spawn`
    /// (the connect phase counts against it). Expiry cancels the session
    /// through the same path as a manual `cancel()`.
    pub deadline_ms: Option<u64>,
    /// Maximum bytes one frame may buffer before it is dropped as
    /// malformed (default 1 MiB).
    pub max_frame_bytes: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 50,
            connect_timeout_ms: 10_000,
            deadline_ms: None,
            max_frame_bytes: 1024 * 1024,
        }
    }
}
