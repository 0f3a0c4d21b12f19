use chrono::{DateTime, Utc};
use std::sync::Arc;
use typewriter_core::{ActiveStreams, ResponseSelector, SessionConfig};

use crate::config::AppConfig;

pub struct AppState {
    pub config: Arc<AppConfig>,
    pub selector: ResponseSelector,
    pub streams: ActiveStreams,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let selector = ResponseSelector::new(config.responses.clone());
        Self {
            config: Arc::new(config),
            selector,
            streams: ActiveStreams::new(),
            started_at: Utc::now(),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        self.config.session_config()
    }

    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
