pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod server;
pub mod sse;
pub mod state;

pub use config::{AppConfig, ConfigError, ServerArgs};
pub use error::AppError;
pub use server::{app_config, build_cors, configure_static, json_config, run_server};
pub use sse::SseTransport;
pub use state::AppState;
