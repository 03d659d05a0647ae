//! Client configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via IBWIRE_CONFIG)
//! 3. Environment variables

use crate::connection::{ConnectionConfig, DEFAULT_READ_BUFFER_SIZE};
use ibwire_protocol::DEFAULT_PORT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gateway connection settings.
    pub connection: ConnectionSettings,
    /// Market data settings.
    pub market_data: MarketDataSettings,
}

impl Config {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("IBWIRE_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        self.connection.apply_env_overrides();
        self.market_data.apply_env_overrides();
    }

    /// Checks values that serde cannot reject on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection.host.is_empty() {
            return Err(ConfigError::ValidationError("host is empty".to_string()));
        }
        if self.connection.port == 0 {
            return Err(ConfigError::ValidationError("port must be nonzero".to_string()));
        }
        self.market_data.validate()
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }
}

/// Gateway connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub client_id: i32,
    /// Wait for the verify exchange before activating the session.
    pub extra_auth: bool,
    pub connect_timeout_secs: u64,
    /// Socket read buffer size in bytes.
    pub read_buffer_size: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            client_id: 0,
            extra_auth: false,
            connect_timeout_secs: 10,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl ConnectionSettings {
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("IBWIRE_HOST") {
            self.host = host;
        }

        if let Ok(port) = std::env::var("IBWIRE_PORT") {
            if let Ok(p) = port.parse() {
                self.port = p;
            }
        }

        if let Ok(id) = std::env::var("IBWIRE_CLIENT_ID") {
            if let Ok(n) = id.parse() {
                self.client_id = n;
            }
        }

        if let Ok(auth) = std::env::var("IBWIRE_EXTRA_AUTH") {
            self.extra_auth = auth == "1" || auth.to_lowercase() == "true";
        }

        if let Ok(timeout) = std::env::var("IBWIRE_CONNECT_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.connect_timeout_secs = secs;
            }
        }

        if let Ok(size) = std::env::var("IBWIRE_READ_BUFFER_SIZE") {
            if let Ok(n) = size.parse() {
                self.read_buffer_size = n;
            }
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Builds the connection configuration. The buffer size is clamped.
    pub fn to_connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::new(self.host.clone(), self.port)
            .with_client_id(self.client_id)
            .with_extra_auth(self.extra_auth)
            .with_connect_timeout(self.connect_timeout())
            .with_read_buffer_size(self.read_buffer_size)
    }
}

/// Market data settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketDataSettings {
    /// Market data type requested after connecting (1 live, 2 frozen,
    /// 3 delayed, 4 delayed frozen). Unset leaves the server default.
    pub market_data_type: Option<i32>,
}

impl MarketDataSettings {
    fn apply_env_overrides(&mut self) {
        if let Ok(t) = std::env::var("IBWIRE_MARKET_DATA_TYPE") {
            if let Ok(n) = t.parse() {
                self.market_data_type = Some(n);
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self.market_data_type {
            Some(t) if !(1..=4).contains(&t) => Err(ConfigError::ValidationError(format!(
                "market_data_type must be between 1 and 4, got {}",
                t
            ))),
            _ => Ok(()),
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
