//! Configuration loading for the client
//!
//! Connection settings are read from a TOML file or string. Credentials are
//! not stored inline; the config names environment variables holding them
//! and they are resolved at connect time.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::session::SessionProps;

/// Top-level client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    pub session: SessionSection,
    #[serde(default)]
    pub dispatch: DispatchSection,
}

/// `[session]` table mapping onto [`SessionProps`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSection {
    /// Broker URL with protocol and port
    pub host: String,
    /// Message VPN name
    pub vpn: String,
    /// Environment variable containing the username
    pub username_env: Option<String>,
    /// Environment variable containing the password
    pub password_env: Option<String>,
    /// Client name presented to the broker
    #[serde(default)]
    pub client_name: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u32,
    #[serde(default = "default_reconnect_retries")]
    pub reconnect_retries: u32,
    #[serde(default = "default_keep_alive_ms")]
    pub keep_alive_ms: u32,
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
    #[serde(default = "default_reapply_subscriptions")]
    pub reapply_subscriptions: bool,
}

fn default_connect_timeout_ms() -> u32 {
    3000
}

fn default_reconnect_retries() -> u32 {
    10
}

fn default_keep_alive_ms() -> u32 {
    3000
}

fn default_compression_level() -> u32 {
    1
}

fn default_reapply_subscriptions() -> bool {
    true
}

/// `[dispatch]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchSection {
    /// Default upper bound on entries in a message property map
    #[serde(default = "default_prop_map_capacity")]
    pub prop_map_capacity: usize,
}

fn default_prop_map_capacity() -> usize {
    crate::runtime::DEFAULT_PROP_MAP_CAPACITY
}

impl Default for DispatchSection {
    fn default() -> Self {
        DispatchSection {
            prop_map_capacity: default_prop_map_capacity(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Environment variable not found: {var}")]
    MissingEnvVar { var: String },
}

impl PartialEq for ConfigError {
    fn eq(&self, other: &Self) -> bool {
        // Io/toml sources are not comparable; match on the rendered message.
        self.to_string() == other.to_string()
    }
}

impl ClientConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session.host.is_empty() {
            return Err(ConfigError::Invalid {
                message: "session.host must not be empty".to_string(),
            });
        }
        if self.session.vpn.is_empty() {
            return Err(ConfigError::Invalid {
                message: "session.vpn must not be empty".to_string(),
            });
        }
        if self.dispatch.prop_map_capacity == 0 {
            return Err(ConfigError::Invalid {
                message: "dispatch.prop_map_capacity must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Resolve credentials from the environment and build session
    /// properties
    pub fn session_props(&self) -> Result<SessionProps, ConfigError> {
        let username = resolve_env(self.session.username_env.as_deref())?;
        let password = resolve_env(self.session.password_env.as_deref())?;
        Ok(SessionProps::default()
            .host(&self.session.host)
            .vpn(&self.session.vpn)
            .username(username)
            .password(password)
            .client_name(&self.session.client_name)
            .connect_timeout_ms(self.session.connect_timeout_ms)
            .reconnect_retries(self.session.reconnect_retries)
            .keep_alive_ms(self.session.keep_alive_ms)
            .compression_level(self.session.compression_level)
            .reapply_subscriptions(self.session.reapply_subscriptions))
    }
}

fn resolve_env(var: Option<&str>) -> Result<String, ConfigError> {
    match var {
        None => Ok(String::new()),
        Some(var) => std::env::var(var).map_err(|_| ConfigError::MissingEnvVar {
            var: var.to_string(),
        }),
    }
}
