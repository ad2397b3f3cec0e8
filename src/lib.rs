//! envagent - environmental telemetry agent
//!
//! An embedded-style agent that samples environmental sensors, authenticates
//! to a cloud MQTT broker with short-lived ES256 tokens, and publishes status
//! and telemetry on intervals that can be changed remotely.
//!
//! # Overview
//!
//! - [`auth`] - device token signing
//! - [`session`] - the credentialed broker session and its reconnect policy
//! - [`agent`] - live intervals, the scheduler and the control loop
//! - [`transport`] - the pub/sub abstraction and its MQTT implementation
//! - [`protocol`] - device identity, topic paths and wire documents
//!
//! # Quick Start
//!
//! ```rust
//! use envagent::agent::{ConfigStore, IntervalKind, ScheduledAction, Scheduler};
//! use envagent::protocol::ConfigUpdate;
//!
//! let mut config = ConfigStore::new();
//! let update = ConfigUpdate::from_payload(br#"{"env": 1000}"#).unwrap();
//! config.apply_update(&update);
//! assert_eq!(config.get(IntervalKind::Sampling), 1000);
//!
//! let mut scheduler = Scheduler::new(0);
//! assert_eq!(scheduler.tick(1000, &config), vec![ScheduledAction::Sample]);
//! ```

pub mod agent;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod observability;
pub mod protocol;
pub mod sensor;
pub mod session;
pub mod testing;
pub mod transport;

pub use agent::{Agent, AgentState, ConfigStore, IntervalKind, Scheduler, TelemetryBuffer};
pub use auth::{jwt::Es256Signer, CredentialSigner, Token};
pub use config::{AgentConfig, ConfigError};
pub use error::{AgentError, AgentResult};
pub use protocol::*;
pub use session::{SessionManager, SessionState};
pub use transport::mqtt::MqttClient;
