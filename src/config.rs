//! Configuration management for DeepDrone.
//!
//! Configuration can be set via environment variables:
//! - `GLM_API_KEY` - Required. Key for the tool-calling model.
//! - `GLM_MODEL` - Optional. Tool-calling model. Defaults to `glm-4.5`.
//! - `DEEPSEEK_API_KEY` - Optional. Key for the conversational model. Without it,
//!   conversational replies are a fixed authentication-error message.
//! - `DEEPSEEK_MODEL` - Optional. Conversational model. Defaults to `deepseek-reasoner`.
//! - `DRONE_CONNECTION` - Optional. Default connection string. Defaults to `udp:127.0.0.1:14550`.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `8501`.
//! - `MISSION_TRANSIT_DELAY_MS` - Optional. Simulated time per waypoint leg. Defaults to `2000`.
//! - `MISSION_SETTLE_DELAY_MS` - Optional. Wait after a return-to-home. Defaults to `2000`.

use std::time::Duration;
use thiserror::Error;

use crate::llm::ProviderConfig;
use crate::mission::MissionTiming;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Provider used for tool-calling turns
    pub tool_provider: ProviderConfig,

    /// Key for the tool provider
    pub tool_api_key: String,

    /// Provider used for conversational turns
    pub chat_provider: ProviderConfig,

    /// Key for the chat provider, if configured
    pub chat_api_key: Option<String>,

    /// Connection string suggested to the model
    pub drone_connection: String,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Mission loop timings
    pub mission_timing: MissionTiming,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `GLM_API_KEY` is not set, and
    /// `ConfigError::InvalidValue` for unparseable numbers.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut tool_provider = ProviderConfig::glm();
        let tool_api_key = non_empty_var(&tool_provider.api_key_env)
            .ok_or_else(|| ConfigError::MissingEnvVar(tool_provider.api_key_env.clone()))?;
        if let Some(model) = non_empty_var("GLM_MODEL") {
            tool_provider = tool_provider.with_model(model);
        }

        let mut chat_provider = ProviderConfig::deepseek();
        let chat_api_key = non_empty_var(&chat_provider.api_key_env);
        if let Some(model) = non_empty_var("DEEPSEEK_MODEL") {
            chat_provider = chat_provider.with_model(model);
        }

        let drone_connection = std::env::var("DRONE_CONNECTION")
            .unwrap_or_else(|_| "udp:127.0.0.1:14550".to_string());

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = parse_var("PORT", 8501u16)?;

        let mission_timing = MissionTiming {
            transit_delay: Duration::from_millis(parse_var("MISSION_TRANSIT_DELAY_MS", 2000u64)?),
            settle_delay: Duration::from_millis(parse_var("MISSION_SETTLE_DELAY_MS", 2000u64)?),
        };

        Ok(Self {
            tool_provider,
            tool_api_key,
            chat_provider,
            chat_api_key,
            drone_connection,
            host,
            port,
            mission_timing,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(tool_api_key: String, chat_api_key: Option<String>) -> Self {
        Self {
            tool_provider: ProviderConfig::glm(),
            tool_api_key,
            chat_provider: ProviderConfig::deepseek(),
            chat_api_key,
            drone_connection: "udp:127.0.0.1:14550".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8501,
            mission_timing: MissionTiming::default(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}
