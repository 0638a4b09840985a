//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Delay between a single-select auto-advance answer and the transition,
    /// long enough for the selection highlight to render.
    pub auto_advance_delay: Duration,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            auto_advance_delay: Duration::from_millis(300),
            event_capacity: 256,
        }
    }
}

impl FlowConfig {
    /// Build from `ONBOARDING_AUTO_ADVANCE_MS` and `ONBOARDING_EVENT_CAPACITY`,
    /// falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(ms) = parse_var::<u64>(&lookup, "ONBOARDING_AUTO_ADVANCE_MS")? {
            config.auto_advance_delay = Duration::from_millis(ms);
        }
        if let Some(capacity) = parse_var::<usize>(&lookup, "ONBOARDING_EVENT_CAPACITY")? {
            if capacity == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "ONBOARDING_EVENT_CAPACITY".to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
            config.event_capacity = capacity;
        }
        Ok(config)
    }
}

/// Settings for the bundled HTTP/WebSocket server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// JSON flow definition to serve.
    pub flow_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            flow_path: PathBuf::from("demos/welcome_flow.json"),
        }
    }
}

impl ServerConfig {
    /// Build from `ONBOARDING_PORT` and `ONBOARDING_FLOW_PATH`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(port) = parse_var::<u16>(&lookup, "ONBOARDING_PORT")? {
            config.port = port;
        }
        if let Some(path) = lookup("ONBOARDING_FLOW_PATH") {
            config.flow_path = PathBuf::from(path);
        }
        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{raw:?}: {e}"),
            }),
        None => Ok(None),
    }
}
