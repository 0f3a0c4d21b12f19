//! Startup configuration.
//!
//! Values come from CLI flags / environment variables and an optional YAML
//! file. Flags win over the file. The result is an immutable [`AppConfig`]
//! shared with every worker through `web::Data`.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use typewriter_core::{ResponseEntry, ResponseTable, SessionConfig, DEFAULT_CADENCE};

#[derive(Parser, Debug, Clone)]
#[command(name = "typewriter-server")]
#[command(about = "Streams canned AI-style responses one character at a time")]
#[command(version)]
pub struct ServerArgs {
    /// Enable debug mode
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    /// Bind address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Server port
    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Milliseconds between two streamed characters
    #[arg(long, env = "STREAM_CADENCE_MS")]
    pub cadence_ms: Option<u64>,

    /// YAML file with the response table and CORS allow-list
    #[arg(long, env = "TYPEWRITER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Origin allowed to call the API (repeatable or comma-separated)
    #[arg(long = "allowed-origin", env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// Directory served under /ui
    #[arg(long, env = "STATIC_DIR", default_value = "public")]
    pub static_dir: PathBuf,

    /// Abort streams that run longer than this
    #[arg(long, env = "STREAM_TIMEOUT_SECS")]
    pub stream_timeout_secs: Option<u64>,

    /// Log level (overrides debug flag)
    #[arg(long, env = "RUST_LOG")]
    pub log_level: Option<String>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Stream cadence must be at least 1ms")]
    ZeroCadence,

    #[error("Invalid allowed origin '{0}': expected http(s)://host[:port] or '*'")]
    InvalidOrigin(String),
}

/// Shape of the optional YAML config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub cadence_ms: Option<u64>,
    pub stream_timeout_secs: Option<u64>,
    pub allowed_origins: Vec<String>,
    pub responses: Vec<ResponseEntry>,
    pub default_response: Option<String>,
}

impl FileConfig {
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cadence: Duration,
    pub stream_timeout: Option<Duration>,
    pub allowed_origins: Vec<String>,
    pub static_dir: PathBuf,
    pub responses: Arc<ResponseTable>,
}

impl AppConfig {
    pub fn load(args: &ServerArgs) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => {
                let content =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                        path: path.clone(),
                        source,
                    })?;
                log::info!("Loaded config file {:?}", path);
                FileConfig::from_yaml(&content)?
            }
            None => FileConfig::default(),
        };

        Self::from_sources(args, file)
    }

    pub fn from_sources(args: &ServerArgs, file: FileConfig) -> Result<Self, ConfigError> {
        let cadence_ms = match args.cadence_ms.or(file.cadence_ms) {
            Some(ms) => ms,
            None => u64::try_from(DEFAULT_CADENCE.as_millis()).unwrap_or(u64::MAX),
        };
        if cadence_ms == 0 {
            return Err(ConfigError::ZeroCadence);
        }

        let allowed_origins = if args.allowed_origins.is_empty() {
            file.allowed_origins
        } else {
            args.allowed_origins.clone()
        };
        let allowed_origins = allowed_origins
            .into_iter()
            .map(|origin| origin.trim().trim_end_matches('/').to_string())
            .filter(|origin| !origin.is_empty())
            .collect::<Vec<_>>();
        for origin in &allowed_origins {
            validate_origin(origin)?;
        }

        let builtin = ResponseTable::builtin();
        let entries = if file.responses.is_empty() {
            builtin.entries().to_vec()
        } else {
            file.responses
        };
        let default_text = file
            .default_response
            .unwrap_or_else(|| builtin.default_text().to_string());

        Ok(Self {
            host: args.host.clone(),
            port: args.port,
            cadence: Duration::from_millis(cadence_ms),
            stream_timeout: args
                .stream_timeout_secs
                .or(file.stream_timeout_secs)
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            allowed_origins,
            static_dir: args.static_dir.clone(),
            responses: Arc::new(ResponseTable::new(entries, default_text)),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            cadence: self.cadence,
            deadline: self.stream_timeout,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cadence: DEFAULT_CADENCE,
            stream_timeout: None,
            allowed_origins: Vec::new(),
            static_dir: PathBuf::from("public"),
            responses: Arc::new(ResponseTable::builtin()),
        }
    }
}

fn validate_origin(origin: &str) -> Result<(), ConfigError> {
    if origin == "*" {
        return Ok(());
    }
    let host = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
        .ok_or_else(|| ConfigError::InvalidOrigin(origin.to_string()))?;
    if host.is_empty() || host.contains(['/', ' ', '?', '#']) {
        return Err(ConfigError::InvalidOrigin(origin.to_string()));
    }
    Ok(())
}
