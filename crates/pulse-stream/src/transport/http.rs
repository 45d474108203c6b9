//! HTTP-stream transport: one long-lived response body read as chunks.

use std::time::Duration;

use futures::TryStreamExt;
use pulse_core::errors::TransportError;
use tracing::debug;

use super::{ChunkStream, StreamEndpoint};

/// Long-lived HTTP response body transport.
///
/// Data arrives strictly after the request is issued, as a sequence of
/// reads from one response body. A non-2xx status is an immediate open
/// failure. The connect timeout bounds the time to response headers only;
/// no request timeout is set, since the body is expected to stay open
/// indefinitely.
pub struct HttpTransport {
    endpoint: StreamEndpoint,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Transport for the given endpoint. The client is built once here and
    /// reused across `open()` calls.
    #[must_use]
    pub fn new(endpoint: StreamEndpoint) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }

    /// Issue the request and hand back the body's chunk stream.
    pub async fn open(&self, connect_timeout: Duration) -> Result<ChunkStream, TransportError> {
        let mut request = self.client.get(self.endpoint.url());
        if let Some(token) = self.endpoint.bearer_token() {
            request = request.bearer_auth(token);
        }

        let timeout_ms = u64::try_from(connect_timeout.as_millis()).unwrap_or(u64::MAX);
        let response = tokio::time::timeout(connect_timeout, request.send())
            .await
            .map_err(|_| TransportError::Timeout { timeout_ms })??;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }
        debug!(url = %self.endpoint.url(), status = status.as_u16(), "stream opened");

        let chunks = response.bytes_stream().map_err(TransportError::from);
        Ok(Box::pin(chunks))
    }
}
