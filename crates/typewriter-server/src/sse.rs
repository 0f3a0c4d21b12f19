//! actix-web adapter for [`StreamTransport`].
//!
//! Frames go through a bounded channel whose receiver is the response body.
//! actix drops the body when the client hangs up, which closes the channel and
//! resolves [`StreamTransport::client_closed`].

use actix_web::web::Bytes;
use actix_web::HttpResponse;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use typewriter_core::{StreamEvent, StreamMetadata, StreamTransport, TransportError};

pub const SSE_CHANNEL_CAPACITY: usize = 32;
pub const CONNECTED_MARKER: &str = ": connected\n\n";

pub struct SseTransport {
    sender: Mutex<Option<mpsc::Sender<Bytes>>>,
}

impl SseTransport {
    pub fn channel(capacity: usize) -> (Arc<Self>, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity);
        let transport = Arc::new(Self {
            sender: Mutex::new(Some(tx)),
        });
        (transport, rx)
    }

    fn sender(&self) -> Option<mpsc::Sender<Bytes>> {
        self.sender
            .lock()
            .map(|sender| sender.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    async fn send(&self, frame: Bytes) -> Result<(), TransportError> {
        let sender = self.sender().ok_or(TransportError::Closed)?;
        sender
            .send(frame)
            .await
            .map_err(|_| TransportError::Disconnected)
    }
}

#[async_trait]
impl StreamTransport for SseTransport {
    async fn open(&self, _metadata: &StreamMetadata) -> Result<(), TransportError> {
        self.send(Bytes::from_static(CONNECTED_MARKER.as_bytes()))
            .await
    }

    async fn push(&self, event: &StreamEvent) -> Result<(), TransportError> {
        let frame = event.to_sse_frame()?;
        self.send(Bytes::from(frame)).await
    }

    fn close(&self) {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(sender);
    }

    fn is_closed(&self) -> bool {
        self.sender().is_none()
    }

    async fn client_closed(&self) {
        match self.sender() {
            Some(sender) => sender.closed().await,
            // Closed from our side; that is not a disconnect.
            None => std::future::pending::<()>().await,
        }
    }
}

/// Streaming response carrying `metadata`'s headers, fed by `rx`.
pub fn sse_response(metadata: &StreamMetadata, mut rx: mpsc::Receiver<Bytes>) -> HttpResponse {
    let mut builder = HttpResponse::Ok();
    for (name, value) in &metadata.headers {
        builder.insert_header((*name, *value));
    }

    builder.streaming(async_stream::stream! {
        while let Some(item) = rx.recv().await {
            yield Ok::<_, actix_web::Error>(item);
        }
    })
}
