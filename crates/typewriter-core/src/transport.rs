use async_trait::async_trait;

use crate::error::TransportError;
use crate::event::StreamEvent;

/// Response headers a transport must commit to before the first push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMetadata {
    pub headers: Vec<(&'static str, &'static str)>,
}

impl StreamMetadata {
    /// Server-Sent Events with every intermediary buffer and cache disabled.
    pub fn sse() -> Self {
        Self {
            headers: vec![
                ("content-type", "text/event-stream"),
                ("cache-control", "no-cache, no-transform"),
                ("connection", "keep-alive"),
                ("x-accel-buffering", "no"),
                ("content-encoding", "identity"),
            ],
        }
    }

    pub fn header(&self, name: &str) -> Option<&'static str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| *value)
    }
}

impl Default for StreamMetadata {
    fn default() -> Self {
        Self::sse()
    }
}

/// One open push connection to a client.
///
/// After [`close`](StreamTransport::close), `push` must return
/// [`TransportError::Closed`] rather than panic.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Commit to a persistent push response and emit the connection marker.
    async fn open(&self, metadata: &StreamMetadata) -> Result<(), TransportError>;

    async fn push(&self, event: &StreamEvent) -> Result<(), TransportError>;

    /// Ends the stream. Idempotent.
    fn close(&self);

    fn is_closed(&self) -> bool;

    /// Resolves once the remote peer has gone away.
    async fn client_closed(&self);

    /// Resolves with the cause of a transport-level failure.
    async fn failed(&self) -> TransportError {
        std::future::pending::<TransportError>().await
    }
}
