use actix_web::{web, HttpResponse};
use serde::Deserialize;
use typewriter_core::{Prompt, StreamMetadata, StreamSession, StreamTransport};
use uuid::Uuid;

use crate::error::Result;
use crate::sse::{sse_response, SseTransport, SSE_CHANNEL_CAPACITY};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StreamRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Validates the prompt, starts a session and returns the SSE response.
///
/// The session keeps running on its own task after this returns.
pub async fn handler(
    state: web::Data<AppState>,
    req: web::Json<StreamRequest>,
) -> Result<HttpResponse> {
    let prompt = Prompt::parse(req.into_inner().prompt)?;
    let stream_id = Uuid::new_v4().to_string();

    let response = state.selector.render(&prompt);
    log::info!(
        "[{}] Prompt received ({} chars), matched {}",
        stream_id,
        prompt.as_str().chars().count(),
        response.keyword().unwrap_or("default")
    );

    let metadata = StreamMetadata::sse();
    let (transport, body) = SseTransport::channel(SSE_CHANNEL_CAPACITY);
    transport.open(&metadata).await?;

    let session = StreamSession::new(
        stream_id.clone(),
        response,
        transport,
        state.session_config(),
    );
    log::debug!("[{}] Streaming {} chars", stream_id, session.total_chars());
    // Detached: the session tears itself down on completion or disconnect.
    let _handle = session.start(&state.streams);

    Ok(sse_response(&metadata, body))
}
