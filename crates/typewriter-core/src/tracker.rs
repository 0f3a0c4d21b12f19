use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Count of cadence tasks currently alive, shared by every session of a server.
#[derive(Debug, Clone, Default)]
pub struct ActiveStreams {
    count: Arc<AtomicUsize>,
}

impl ActiveStreams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn acquire(&self) -> StreamGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        StreamGuard {
            count: self.count.clone(),
        }
    }
}

/// Decrements the gauge when dropped.
#[derive(Debug)]
pub struct StreamGuard {
    count: Arc<AtomicUsize>,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}
