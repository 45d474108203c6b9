//! Transport channel: two delivery mechanisms, one interface.
//!
//! A [`TransportChannel`] produces raw byte chunks in arrival order from
//! either a long-lived HTTP response body or a full-duplex push socket.
//! Everything downstream (decoder, parser, router) is transport-agnostic;
//! the only per-transport knowledge that escapes is the [`Framing`] mode.
//!
//! Cancellation is owned by the session, not the channel: the session's
//! `tokio::select!` against its cancellation token unblocks any pending
//! read on the returned stream.

mod http;
mod socket;

use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use pulse_core::errors::TransportError;
use pulse_core::ids::ResourceId;

use crate::decoder::Framing;
pub use http::HttpTransport;
pub use socket::SocketTransport;

/// Boxed stream of raw chunks produced by an opened channel.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Where a stream session connects.
///
/// The resource id is embedded in the endpoint path; authentication is an
/// optional bearer token passed out-of-band as a header. The streaming
/// core needs nothing else about how the channel was authorized.
#[derive(Clone, Debug)]
pub struct StreamEndpoint {
    base_url: String,
    resource: ResourceId,
    bearer_token: Option<String>,
}

impl StreamEndpoint {
    /// Endpoint for a resource under a base URL (`http(s)://` for the HTTP
    /// variant, `ws(s)://` for the socket variant).
    #[must_use]
    pub fn new(base_url: impl Into<String>, resource: ResourceId) -> Self {
        Self {
            base_url: base_url.into(),
            resource,
            bearer_token: None,
        }
    }

    /// Attach a bearer token sent as the `Authorization` header.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Full URL with the resource id embedded in the path.
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.resource
        )
    }

    pub(crate) fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }
}

/// One of the two delivery mechanisms behind a common surface.
pub enum TransportChannel {
    /// Half-duplex long-lived HTTP response body.
    Http(HttpTransport),
    /// Full-duplex push socket.
    Socket(SocketTransport),
}

impl TransportChannel {
    /// HTTP-stream variant.
    #[must_use]
    pub fn http(endpoint: StreamEndpoint) -> Self {
        Self::Http(HttpTransport::new(endpoint))
    }

    /// Push-socket variant.
    #[must_use]
    pub fn socket(endpoint: StreamEndpoint) -> Self {
        Self::Socket(SocketTransport::new(endpoint))
    }

    /// Framing mode the frame decoder must use for this channel.
    #[must_use]
    pub fn framing(&self) -> Framing {
        match self {
            Self::Http(_) => Framing::BlankLine,
            Self::Socket(_) => Framing::WholeChunk,
        }
    }

    /// Establish one network connection and return its chunk stream.
    ///
    /// A non-success response status (HTTP variant) or a refused/timed-out
    /// connect is an immediate open failure.
    pub async fn open(&self, connect_timeout: Duration) -> Result<ChunkStream, TransportError> {
        match self {
            Self::Http(t) => t.open(connect_timeout).await,
            Self::Socket(t) => t.open(connect_timeout).await,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
