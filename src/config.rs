//! Startup configuration
//!
//! Loaded once from a TOML file. Holds the device identity, broker settings,
//! reconnection policy and the initial scheduling intervals. The intervals
//! can later be changed remotely; see [`crate::agent::ConfigStore`].

use crate::protocol::Identity;
use crate::session::RetryPolicy;
use crate::transport::mqtt::BrokerEndpoint;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Main agent configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    pub device: DeviceSection,
    #[serde(default)]
    pub mqtt: MqttSection,
    #[serde(default)]
    pub reconnect: ReconnectSection,
    #[serde(default)]
    pub schedule: ScheduleSection,
}

/// Device identity within the cloud broker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceSection {
    pub project_id: String,
    pub region: String,
    pub registry_id: String,
    pub device_id: String,
}

/// Broker connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MqttSection {
    /// Broker URL, `mqtts://host:port` or `mqtt://host:port`
    #[serde(default = "default_broker_url")]
    pub broker_url: String,
    /// Username sent alongside the token; ignored by token-authenticating brokers
    #[serde(default = "default_username")]
    pub username: String,
    /// PKCS#8 PEM file holding the device's EC P-256 private key
    #[serde(default = "default_private_key_path")]
    pub private_key_path: PathBuf,
    /// Environment variable that, when set, overrides `private_key_path`
    pub private_key_env: Option<String>,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// How long each poll services the connection, in milliseconds
    #[serde(default = "default_poll_window_ms")]
    pub poll_window_ms: u64,
}

impl Default for MqttSection {
    fn default() -> Self {
        Self {
            broker_url: default_broker_url(),
            username: default_username(),
            private_key_path: default_private_key_path(),
            private_key_env: None,
            keep_alive_secs: default_keep_alive_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            poll_window_ms: default_poll_window_ms(),
        }
    }
}

fn default_broker_url() -> String {
    "mqtts://mqtt.googleapis.com:8883".to_string()
}

fn default_username() -> String {
    "unused".to_string()
}

fn default_private_key_path() -> PathBuf {
    PathBuf::from("keys/device-ec.pem")
}

fn default_keep_alive_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_poll_window_ms() -> u64 {
    50
}

/// Reconnection policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconnectSection {
    /// Fixed delay between failed connection attempts
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Give up after this many failed attempts (unset = retry forever)
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectSection {
    fn default() -> Self {
        Self {
            backoff_ms: default_backoff_ms(),
            max_attempts: None,
        }
    }
}

fn default_backoff_ms() -> u64 {
    5000
}

/// Initial scheduling intervals in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleSection {
    #[serde(default = "default_sampling_ms")]
    pub sampling_ms: i64,
    #[serde(default = "default_status_ms")]
    pub status_ms: i64,
    #[serde(default = "default_telemetry_ms")]
    pub telemetry_ms: i64,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            sampling_ms: default_sampling_ms(),
            status_ms: default_status_ms(),
            telemetry_ms: default_telemetry_ms(),
        }
    }
}

fn default_sampling_ms() -> i64 {
    60_000
}

fn default_status_ms() -> i64 {
    600_000
}

fn default_telemetry_ms() -> i64 {
    600_000
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid device identity: {0}")]
    InvalidIdentity(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AgentConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AgentConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.identity()
            .validate()
            .map_err(|e| ConfigError::InvalidIdentity(e.to_string()))?;

        BrokerEndpoint::parse(&self.mqtt.broker_url)
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;

        if self.mqtt.keep_alive_secs < 5 {
            return Err(ConfigError::InvalidConfig(
                "mqtt.keep_alive_secs must be at least 5".to_string(),
            ));
        }
        if self.mqtt.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "mqtt.connect_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.mqtt.poll_window_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "mqtt.poll_window_ms must be greater than 0".to_string(),
            ));
        }
        if self.reconnect.backoff_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "reconnect.backoff_ms must be greater than 0".to_string(),
            ));
        }
        if self.reconnect.max_attempts == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "reconnect.max_attempts must be greater than 0 or unset for unlimited"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Device identity described by the `[device]` section
    pub fn identity(&self) -> Identity {
        Identity::new(
            self.device.project_id.clone(),
            self.device.region.clone(),
            self.device.registry_id.clone(),
            self.device.device_id.clone(),
        )
    }

    /// Broker endpoint parsed from `mqtt.broker_url`
    pub fn broker_endpoint(&self) -> Result<BrokerEndpoint, ConfigError> {
        BrokerEndpoint::parse(&self.mqtt.broker_url)
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))
    }

    /// Reconnection policy described by the `[reconnect]` section
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.reconnect.max_attempts,
            backoff: Duration::from_millis(self.reconnect.backoff_ms),
        }
    }

    /// Private key location, honouring the `private_key_env` override
    pub fn private_key_path(&self) -> PathBuf {
        self.mqtt
            .private_key_env
            .as_ref()
            .and_then(|name| std::env::var_os(name))
            .map(PathBuf::from)
            .unwrap_or_else(|| self.mqtt.private_key_path.clone())
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[device]
project_id = "my-project"
region = "europe-west1"
registry_id = "sensors"
device_id = "mkr-env-01"

[mqtt]
broker_url = "mqtt://localhost:1883"
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}
