use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::event::StreamEvent;
use crate::transport::{StreamMetadata, StreamTransport};

/// In-memory transport that records every pushed event.
pub struct RecordingTransport {
    events: Mutex<Vec<StreamEvent>>,
    opened: AtomicBool,
    closed: AtomicBool,
    disconnect: CancellationToken,
    error_raised: CancellationToken,
    error: Mutex<Option<TransportError>>,
    disconnect_after: Option<usize>,
    fail_after: Option<usize>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            opened: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            disconnect: CancellationToken::new(),
            error_raised: CancellationToken::new(),
            error: Mutex::new(None),
            disconnect_after: None,
            fail_after: None,
        }
    }

    /// The peer goes away right after receiving `count` events.
    pub fn disconnect_after(mut self, count: usize) -> Self {
        self.disconnect_after = Some(count);
        self
    }

    /// Pushes beyond the first `count` are rejected.
    pub fn fail_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub fn raise_error(&self, error: TransportError) {
        *self.error.lock().unwrap() = Some(error);
        self.error_raised.cancel();
    }

    pub fn events(&self) -> Vec<StreamEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Concatenation of every chunk received so far.
    pub fn text(&self) -> String {
        self.events()
            .iter()
            .filter_map(|event| match event {
                StreamEvent::Chunk { chunk, .. } => Some(*chunk),
                StreamEvent::Done { .. } => None,
            })
            .collect()
    }

    pub fn is_opened(&self) -> bool {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamTransport for RecordingTransport {
    async fn open(&self, _metadata: &StreamMetadata) -> Result<(), TransportError> {
        self.opened.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn push(&self, event: &StreamEvent) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        if self.disconnect.is_cancelled() {
            return Err(TransportError::Disconnected);
        }

        let mut events = self.events.lock().unwrap();
        if self.fail_after.is_some_and(|limit| events.len() >= limit) {
            return Err(TransportError::Write("write rejected".to_string()));
        }
        events.push(event.clone());

        if self.disconnect_after == Some(events.len()) {
            self.disconnect.cancel();
        }
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn client_closed(&self) {
        self.disconnect.cancelled().await
    }

    async fn failed(&self) -> TransportError {
        self.error_raised.cancelled().await;
        self.error
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(TransportError::Write("unknown".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_transport_rejects_push_after_close() {
        let transport = RecordingTransport::new();
        transport.open(&StreamMetadata::sse()).await.unwrap();
        assert!(transport.is_opened());

        transport.push(&StreamEvent::chunk('a')).await.unwrap();
        transport.close();
        transport.close();

        assert_eq!(
            transport.push(&StreamEvent::chunk('b')).await,
            Err(TransportError::Closed)
        );
        assert_eq!(transport.text(), "a");
    }
}
