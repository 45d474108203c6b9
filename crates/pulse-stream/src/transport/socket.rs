//! Push-socket transport — thin client over `tokio-tungstenite`.

use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use pulse_core::errors::TransportError;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::debug;

use super::{ChunkStream, StreamEndpoint};

/// Full-duplex push socket transport.
///
/// Each text (or binary) message arrives as one chunk; data may arrive at
/// any time after the connect completes. Nothing is buffered here beyond
/// passing message payloads through; a close frame ends the stream.
pub struct SocketTransport {
    endpoint: StreamEndpoint,
}

impl SocketTransport {
    /// Transport for the given endpoint.
    #[must_use]
    pub fn new(endpoint: StreamEndpoint) -> Self {
        Self { endpoint }
    }

    /// Connect and hand back the message stream as chunks.
    pub async fn open(&self, connect_timeout: Duration) -> Result<ChunkStream, TransportError> {
        let mut request = self.endpoint.url().into_client_request()?;
        if let Some(token) = self.endpoint.bearer_token() {
            let value = HeaderValue::try_from(format!("Bearer {token}")).map_err(|_| {
                TransportError::Dropped {
                    message: "bearer token is not a valid header value".into(),
                }
            })?;
            let _ = request.headers_mut().insert(AUTHORIZATION, value);
        }

        let timeout_ms = u64::try_from(connect_timeout.as_millis()).unwrap_or(u64::MAX);
        let (ws, _) = tokio::time::timeout(connect_timeout, connect_async(request))
            .await
            .map_err(|_| TransportError::Timeout { timeout_ms })??;
        debug!(url = %self.endpoint.url(), "socket opened");

        let chunks = async_stream::stream! {
            let mut ws = ws;
            while let Some(message) = ws.next().await {
                match message {
                    Ok(Message::Text(text)) => yield Ok(Bytes::from(text)),
                    Ok(Message::Binary(bytes)) => yield Ok(bytes),
                    Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                    Ok(Message::Close(_)) => break,
                    Err(e) => {
                        yield Err(TransportError::Socket(e));
                        break;
                    }
                }
            }
        };
        Ok(Box::pin(chunks))
    }
}
