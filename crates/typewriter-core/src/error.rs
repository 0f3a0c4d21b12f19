use thiserror::Error;

/// Rejections raised before any stream is opened.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Field 'prompt' is required")]
    MissingPrompt,

    #[error("Field 'prompt' must not be empty")]
    EmptyPrompt,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Transport already closed")]
    Closed,

    #[error("Client disconnected")]
    Disconnected,

    #[error("Failed to encode event: {0}")]
    Encode(String),

    #[error("Transport write failed: {0}")]
    Write(String),

    #[error("Stream deadline exceeded")]
    Timeout,
}

impl From<serde_json::Error> for TransportError {
    fn from(error: serde_json::Error) -> Self {
        TransportError::Encode(error.to_string())
    }
}
