//! Crate-level error types
//!
//! Each layer has its own error enum; [`AgentError`] aggregates them for the
//! controller and the binary. Error text that may end up in logs goes through
//! [`sanitize_error_message`] first, since connection failures can echo the
//! credential that was presented.

use crate::auth::SigningError;
use crate::config::ConfigError;
use crate::sensor::SensorError;
use crate::session::SessionError;
use crate::transport::mqtt::MqttError;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Main error type for agent operations
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),

    #[error("MQTT setup error: {0}")]
    Mqtt(#[from] MqttError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AgentError {
    /// Create internal error
    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Error text safe to write to logs
    pub fn sanitized(&self) -> String {
        sanitize_error_message(&self.to_string())
    }
}

/// Result type for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

const MAX_MESSAGE_LEN: usize = 500;
const TRUNCATE_SUFFIX: &str = "...[truncated]";

static JWT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]*").expect("valid JWT pattern")
});

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("valid secret pattern")
});

static SENSITIVE_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|keys|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+")
        .expect("valid path pattern")
});

/// Sanitize error messages to prevent credential leakage into logs
pub fn sanitize_error_message(message: &str) -> String {
    let sanitized = JWT_PATTERN.replace_all(message, "***JWT***");
    let sanitized = SECRET_PATTERN.replace_all(&sanitized, "${1}=***");
    let mut sanitized = SENSITIVE_PATH_PATTERN
        .replace_all(&sanitized, "/***REDACTED***/")
        .into_owned();

    // Total length stays <= 500 bytes, cut on a char boundary
    if sanitized.len() > MAX_MESSAGE_LEN {
        let mut cut = MAX_MESSAGE_LEN - TRUNCATE_SUFFIX.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str(TRUNCATE_SUFFIX);
    }

    sanitized
}
