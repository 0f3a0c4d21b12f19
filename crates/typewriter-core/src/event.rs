use serde::{Deserialize, Serialize};

/// Events pushed to the client, serialized as one SSE `data:` payload each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Chunk {
        chunk: char,
        done: bool,
    },

    Done {
        done: bool,
        #[serde(rename = "totalChars")]
        total_chars: usize,
    },
}

impl StreamEvent {
    pub fn chunk(ch: char) -> Self {
        StreamEvent::Chunk {
            chunk: ch,
            done: false,
        }
    }

    pub fn done(total_chars: usize) -> Self {
        StreamEvent::Done {
            done: true,
            total_chars,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. })
    }

    /// Encode as a single SSE frame.
    pub fn to_sse_frame(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("data: {}\n\n", json))
    }
}
