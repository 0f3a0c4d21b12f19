pub mod error;
pub mod event;
pub mod prompt;
pub mod selector;
pub mod session;
pub mod tracker;
pub mod transport;

#[cfg(test)]
mod testing;

pub use error::{TransportError, ValidationError};
pub use event::StreamEvent;
pub use prompt::Prompt;
pub use selector::{RenderedResponse, ResponseEntry, ResponseSelector, ResponseTable};
pub use session::{
    SessionConfig, SessionHandle, SessionOutcome, SessionStatus, StreamSession, DEFAULT_CADENCE,
};
pub use tracker::{ActiveStreams, StreamGuard};
pub use transport::{StreamMetadata, StreamTransport};
