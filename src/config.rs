use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::negotiation::StreamingConfig;
use crate::session::{ReconnectPolicy, SessionConfig};

/// Prefix for environment overrides, e.g. `LIVE_RESUME_SESSION__RECONNECT_DELAY_MS=500`
const ENV_PREFIX: &str = "LIVE_RESUME";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("API key not configured. Set the {0} environment variable.")]
    MissingApiKey(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub input: InputConfig,
    pub streaming: StreamingConfig,
    pub session: SessionSettings,
    pub presenter: PresenterConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the live transcription API
    pub api_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.gladia.io".to_string(),
            api_key_env: "GLADIA_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub file_path: PathBuf,
    pub chunk_duration_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            file_path: PathBuf::from("data/anna-and-sasha-16000.wav"),
            chunk_duration_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PresenterConfig {
    /// Print interim transcripts while they refine
    pub show_partials: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub reconnect_delay_ms: u64,
    /// Multiplier applied per consecutive attempt (1.0 = fixed delay)
    pub reconnect_backoff: f64,
    pub reconnect_max_delay_ms: u64,
    /// Unset means reconnect forever
    pub max_reconnect_attempts: Option<u32>,
    /// 0 disables forced reconnects
    pub forced_reconnect_interval_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: 1000,
            reconnect_backoff: 1.0,
            reconnect_max_delay_ms: 30_000,
            max_reconnect_attempts: None,
            forced_reconnect_interval_ms: 10_000,
        }
    }
}

impl SessionSettings {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            reconnect: ReconnectPolicy {
                base_delay: Duration::from_millis(self.reconnect_delay_ms),
                backoff: self.reconnect_backoff,
                max_delay: Duration::from_millis(self.reconnect_max_delay_ms),
                max_attempts: self.max_reconnect_attempts,
            },
        }
    }

    pub fn forced_reconnect_interval(&self) -> Option<Duration> {
        match self.forced_reconnect_interval_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

impl Config {
    /// Load configuration from built-in defaults, an optional file and the environment
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.service.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey(self.service.api_key_env.clone()))
    }
}
