//! Lifecycle of one outbound character stream.
//!
//! A session runs on its own tokio task. That task owns the cadence interval
//! and is the only writer of the session status, so a tick can never race a
//! cancellation into a write: cancellation is polled first before every tick
//! and again before every push.

use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::event::StreamEvent;
use crate::selector::RenderedResponse;
use crate::tracker::{ActiveStreams, StreamGuard};
use crate::transport::StreamTransport;

pub const DEFAULT_CADENCE: Duration = Duration::from_millis(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Cancelled,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Active)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Delay between two consecutive emissions.
    pub cadence: Duration,
    /// Environment-imposed limit on the whole stream. `None` means unbounded.
    pub deadline: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cadence: DEFAULT_CADENCE,
            deadline: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub status: SessionStatus,
    pub chars_sent: usize,
    pub total_chars: usize,
    pub error: Option<TransportError>,
}

#[derive(Debug, Clone)]
enum Signal {
    Cancel,
    Fail(TransportError),
}

enum Exit {
    Completed,
    Disconnected,
    Signalled,
    Failed(TransportError),
}

pub struct StreamSession {
    id: String,
    chars: Vec<char>,
    cursor: usize,
    transport: Arc<dyn StreamTransport>,
    config: SessionConfig,
}

impl StreamSession {
    pub fn new(
        id: impl Into<String>,
        response: RenderedResponse,
        transport: Arc<dyn StreamTransport>,
        config: SessionConfig,
    ) -> Self {
        Self {
            id: id.into(),
            chars: response.as_str().chars().collect(),
            cursor: 0,
            transport,
            config,
        }
    }

    pub fn total_chars(&self) -> usize {
        self.chars.len()
    }

    /// Arms the cadence and hands the session over to its own task.
    pub fn start(self, streams: &ActiveStreams) -> SessionHandle {
        let cancel = CancellationToken::new();
        let signal = Arc::new(OnceLock::new());
        let (status_tx, status_rx) = watch::channel(SessionStatus::Active);
        let guard = streams.acquire();
        let id = self.id.clone();
        let total_chars = self.chars.len();

        log::debug!(
            "[{}] Stream session started: {} chars every {:?}",
            id,
            total_chars,
            self.config.cadence
        );

        let task = tokio::spawn(self.run(guard, cancel.clone(), signal.clone(), status_tx));

        SessionHandle {
            id,
            total_chars,
            cancel,
            signal,
            status: status_rx,
            task,
        }
    }

    async fn run(
        mut self,
        guard: StreamGuard,
        cancel: CancellationToken,
        signal: Arc<OnceLock<Signal>>,
        status_tx: watch::Sender<SessionStatus>,
    ) -> SessionOutcome {
        let transport = Arc::clone(&self.transport);
        let mut cadence =
            tokio::time::interval_at(Instant::now() + self.config.cadence, self.config.cadence);
        cadence.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let deadline = deadline_elapsed(self.config.deadline);
        tokio::pin!(deadline);

        let exit = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break Exit::Signalled,
                _ = transport.client_closed() => break Exit::Disconnected,
                error = transport.failed() => break Exit::Failed(error),
                _ = &mut deadline => break Exit::Failed(TransportError::Timeout),
                _ = cadence.tick() => {
                    if let Some(exit) = self.emit_next(transport.as_ref(), &cancel).await {
                        break exit;
                    }
                }
            }
        };

        // The cadence must be gone before anything else observes the end state.
        drop(cadence);
        drop(guard);

        let (status, error) = match exit {
            Exit::Completed => (SessionStatus::Completed, None),
            Exit::Disconnected => (SessionStatus::Cancelled, None),
            Exit::Failed(error) => (SessionStatus::Failed, Some(error)),
            Exit::Signalled => match signal.get() {
                Some(Signal::Fail(error)) => (SessionStatus::Failed, Some(error.clone())),
                Some(Signal::Cancel) | None => (SessionStatus::Cancelled, None),
            },
        };

        transport.close();
        status_tx.send_replace(status);

        match (&status, &error) {
            (SessionStatus::Completed, _) => log::info!(
                "[{}] Stream completed: {} chars",
                self.id,
                self.chars.len()
            ),
            (SessionStatus::Failed, Some(error)) => log::warn!(
                "[{}] Stream failed after {}/{} chars: {}",
                self.id,
                self.cursor,
                self.chars.len(),
                error
            ),
            _ => log::info!(
                "[{}] Stream cancelled after {}/{} chars",
                self.id,
                self.cursor,
                self.chars.len()
            ),
        }

        SessionOutcome {
            status,
            chars_sent: self.cursor,
            total_chars: self.chars.len(),
            error,
        }
    }

    /// One cadence tick: the next chunk, or the terminal event once the cursor
    /// reaches the end.
    async fn emit_next(
        &mut self,
        transport: &dyn StreamTransport,
        cancel: &CancellationToken,
    ) -> Option<Exit> {
        let event = match self.chars.get(self.cursor) {
            Some(ch) => StreamEvent::chunk(*ch),
            None => StreamEvent::done(self.chars.len()),
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Some(Exit::Signalled),
            _ = transport.client_closed() => return Some(Exit::Disconnected),
            result = transport.push(&event) => {
                if let Err(error) = result {
                    return Some(Exit::Failed(error));
                }
            }
        }

        if event.is_terminal() {
            return Some(Exit::Completed);
        }

        self.cursor += 1;
        None
    }
}

fn deadline_elapsed(deadline: Option<Duration>) -> impl Future<Output = ()> {
    async move {
        match deadline {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    }
}

/// Control side of a running session.
///
/// Dropping the handle detaches it; the session keeps streaming.
pub struct SessionHandle {
    id: String,
    total_chars: usize,
    cancel: CancellationToken,
    signal: Arc<OnceLock<Signal>>,
    status: watch::Receiver<SessionStatus>,
    task: JoinHandle<SessionOutcome>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the stream as a non-error cancellation. No effect once terminal.
    pub fn cancel(&self) {
        let _ = self.signal.set(Signal::Cancel);
        self.cancel.cancel();
    }

    /// Stops the stream as a failure, e.g. an externally imposed timeout.
    pub fn fail(&self, error: TransportError) {
        let _ = self.signal.set(Signal::Fail(error));
        self.cancel.cancel();
    }

    pub async fn wait(self) -> SessionOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(error) => {
                log::error!("[{}] Stream task aborted: {}", self.id, error);
                SessionOutcome {
                    status: SessionStatus::Failed,
                    chars_sent: 0,
                    total_chars: self.total_chars,
                    error: Some(TransportError::Write(error.to_string())),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::Prompt;
    use crate::selector::{ResponseSelector, ResponseTable};
    use crate::testing::RecordingTransport;
    use chrono::{Local, TimeZone};

    const CADENCE: Duration = Duration::from_millis(30);

    fn rendered(prompt: &str) -> RenderedResponse {
        let at = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        ResponseSelector::new(Arc::new(ResponseTable::builtin()))
            .render_at(&Prompt::try_from(prompt).unwrap(), at)
    }

    fn session(response: RenderedResponse, transport: Arc<RecordingTransport>) -> StreamSession {
        StreamSession::new(
            "test-stream",
            response,
            transport,
            SessionConfig {
                cadence: CADENCE,
                deadline: None,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn completed_session_streams_every_char_then_one_done() {
        let streams = ActiveStreams::new();
        let transport = Arc::new(RecordingTransport::new());
        let response = rendered("Hello");
        let expected = response.as_str().to_string();
        let total = response.char_count();

        let outcome = session(response, transport.clone()).start(&streams).wait().await;

        assert_eq!(outcome.status, SessionStatus::Completed);
        assert_eq!(outcome.chars_sent, total);
        assert_eq!(transport.text(), expected);

        let events = transport.events();
        assert_eq!(events.len(), total + 1);
        assert_eq!(events.last(), Some(&StreamEvent::done(total)));
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);

        assert!(transport.is_closed());
        assert_eq!(streams.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn first_chunk_waits_one_cadence_interval() {
        let streams = ActiveStreams::new();
        let transport = Arc::new(RecordingTransport::new());
        let handle = session(rendered("Hello"), transport.clone()).start(&streams);

        tokio::time::sleep(CADENCE - Duration::from_millis(1)).await;
        assert!(transport.events().is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(transport.events().len(), 1);

        handle.cancel();
        handle.wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn client_disconnect_mid_stream_cancels_without_done() {
        let streams = ActiveStreams::new();
        let transport = Arc::new(RecordingTransport::new().disconnect_after(5));
        let response = rendered("What's new?");
        let prefix: String = response.as_str().chars().take(5).collect();

        let outcome = session(response, transport.clone()).start(&streams).wait().await;

        assert_eq!(outcome.status, SessionStatus::Cancelled);
        assert_eq!(outcome.chars_sent, 5);
        assert_eq!(outcome.error, None);
        assert_eq!(transport.text(), prefix);
        assert_eq!(streams.count(), 0);

        tokio::time::sleep(CADENCE * 10).await;
        assert_eq!(transport.events().len(), 5);
        assert!(transport.events().iter().all(|e| !e.is_terminal()));
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_cancel_stops_further_emission() {
        let streams = ActiveStreams::new();
        let transport = Arc::new(RecordingTransport::new());
        let handle = session(rendered("Tell me about rust"), transport.clone()).start(&streams);

        tokio::time::sleep(CADENCE * 3 + Duration::from_millis(5)).await;
        assert_eq!(transport.events().len(), 3);
        assert_eq!(handle.status(), SessionStatus::Active);

        handle.cancel();
        let outcome = handle.wait().await;

        assert_eq!(outcome.status, SessionStatus::Cancelled);
        assert_eq!(outcome.chars_sent, 3);
        assert_eq!(streams.count(), 0);

        tokio::time::sleep(CADENCE * 5).await;
        assert_eq!(transport.events().len(), 3);
        assert!(transport.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_first_tick_emits_nothing() {
        let streams = ActiveStreams::new();
        let transport = Arc::new(RecordingTransport::new());
        let handle = session(rendered("hello"), transport.clone()).start(&streams);

        handle.cancel();
        let outcome = handle.wait().await;

        assert_eq!(outcome.status, SessionStatus::Cancelled);
        assert!(transport.events().is_empty());
        assert_eq!(streams.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn write_failure_marks_session_failed() {
        let streams = ActiveStreams::new();
        let transport = Arc::new(RecordingTransport::new().fail_after(4));

        let outcome = session(rendered("python?"), transport.clone())
            .start(&streams)
            .wait()
            .await;

        assert_eq!(outcome.status, SessionStatus::Failed);
        assert_eq!(outcome.chars_sent, 4);
        assert!(matches!(outcome.error, Some(TransportError::Write(_))));
        assert!(transport.events().iter().all(|e| !e.is_terminal()));
        assert!(transport.is_closed());
        assert_eq!(streams.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_notification_fails_session() {
        let streams = ActiveStreams::new();
        let transport = Arc::new(RecordingTransport::new());
        let handle = session(rendered("stream it"), transport.clone()).start(&streams);

        tokio::time::sleep(CADENCE * 2 + Duration::from_millis(5)).await;
        transport.raise_error(TransportError::Write("connection reset".to_string()));
        let outcome = handle.wait().await;

        assert_eq!(outcome.status, SessionStatus::Failed);
        assert_eq!(outcome.chars_sent, 2);
        assert_eq!(
            outcome.error,
            Some(TransportError::Write("connection reset".to_string()))
        );
        assert_eq!(streams.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_is_treated_as_failure() {
        let streams = ActiveStreams::new();
        let transport = Arc::new(RecordingTransport::new());
        let config = SessionConfig {
            cadence: CADENCE,
            deadline: Some(CADENCE * 4 + Duration::from_millis(10)),
        };

        let outcome = StreamSession::new("deadline", rendered("hello"), transport.clone(), config)
            .start(&streams)
            .wait()
            .await;

        assert_eq!(outcome.status, SessionStatus::Failed);
        assert_eq!(outcome.error, Some(TransportError::Timeout));
        assert_eq!(outcome.chars_sent, 4);
        assert_eq!(streams.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fail_signal_reports_given_error() {
        let streams = ActiveStreams::new();
        let transport = Arc::new(RecordingTransport::new());
        let handle = session(rendered("hello"), transport.clone()).start(&streams);

        handle.fail(TransportError::Timeout);
        handle.cancel();
        let outcome = handle.wait().await;

        assert_eq!(outcome.status, SessionStatus::Failed);
        assert_eq!(outcome.error, Some(TransportError::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn signals_after_completion_have_no_effect() {
        let streams = ActiveStreams::new();
        let transport = Arc::new(RecordingTransport::new());
        let handle = session(rendered("hi"), transport.clone()).start(&streams);

        assert_eq!(handle.id(), "test-stream");
        assert!(!handle.status().is_terminal());

        while !handle.is_finished() {
            tokio::time::sleep(CADENCE).await;
        }
        assert_eq!(handle.status(), SessionStatus::Completed);
        assert!(handle.status().is_terminal());

        handle.cancel();
        handle.cancel();
        handle.fail(TransportError::Timeout);
        assert_eq!(handle.status(), SessionStatus::Completed);

        let outcome = handle.wait().await;
        assert_eq!(outcome.status, SessionStatus::Completed);
        assert_eq!(
            transport.events().iter().filter(|e| e.is_terminal()).count(),
            1
        );
        transport.close();
        assert!(transport.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_sessions_all_release_their_cadence() {
        let streams = ActiveStreams::new();
        let mut handles = Vec::new();
        let mut transports = Vec::new();

        for i in 0..8 {
            let transport = Arc::new(if i % 2 == 0 {
                RecordingTransport::new()
            } else {
                RecordingTransport::new().disconnect_after(i)
            });
            transports.push(transport.clone());
            handles.push(session(rendered("javascript"), transport).start(&streams));
        }
        assert_eq!(streams.count(), 8);

        for handle in handles {
            handle.wait().await;
        }
        assert_eq!(streams.count(), 0);
        assert!(transports.iter().all(|t| t.is_closed()));
    }
}
