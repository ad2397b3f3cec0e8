//! Credentialed broker session
//!
//! The [`SessionManager`] exclusively owns the transport. Every connection
//! attempt presents a freshly signed token as the password; a token is never
//! reused across attempts, including after a dropped connection.
//!
//! State transitions:
//!
//! ```text
//! Disconnected --ensure_connected--> Connecting --accepted--> Connected
//!      ^                                  |                       |
//!      +------rejected / timeout----------+    liveness lost -----+
//! ```

use super::message_handler::{InboundRoute, MessageHandler};
use super::retry::{RetryDecision, RetryPolicy};
use crate::auth::{CredentialSigner, SigningError};
use crate::clock::Clock;
use crate::error::sanitize_error_message;
use crate::protocol::{ConfigUpdate, Identity, StatusRecord, TelemetryRecord};
use crate::transport::mqtt::BrokerEndpoint;
use crate::transport::{InboundMessage, QoS, Transport, TransportError};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn, Instrument};

/// Connection state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Credential signing failed: {0}")]
    Signing(#[from] SigningError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Session is not connected (state: {state})")]
    NotConnected { state: SessionState },

    #[error("Gave up connecting after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("Failed to serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Outcome of a connect cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectReport {
    /// Connection attempts made; zero when the session was already connected
    pub attempts: u32,
    /// Total time spent in backoff
    pub waited: Duration,
}

impl ConnectReport {
    pub fn already_connected() -> Self {
        Self {
            attempts: 0,
            waited: Duration::ZERO,
        }
    }
}

/// Owner of the one live broker connection
pub struct SessionManager<T: Transport, S: CredentialSigner> {
    identity: Identity,
    client_id: String,
    endpoint: BrokerEndpoint,
    transport: T,
    signer: S,
    policy: RetryPolicy,
    state: SessionState,
}

impl<T: Transport, S: CredentialSigner> SessionManager<T, S> {
    pub fn new(
        identity: Identity,
        endpoint: BrokerEndpoint,
        transport: T,
        signer: S,
        policy: RetryPolicy,
    ) -> Self {
        let client_id = identity.client_id();
        Self {
            identity,
            client_id,
            endpoint,
            transport,
            signer,
            policy,
            state: SessionState::Disconnected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Whether the session is connected and the transport still reports liveness
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected && self.transport.is_connected()
    }

    /// Make sure a live connection exists, blocking through retries until one does
    ///
    /// Returns immediately when already connected. Otherwise runs a full
    /// connect cycle with a new token per attempt and the policy's backoff
    /// between failures. With an unbounded policy this only returns on success.
    pub async fn ensure_connected(&mut self, clock: &dyn Clock) -> Result<ConnectReport, SessionError> {
        if self.is_connected() {
            return Ok(ConnectReport::already_connected());
        }

        if self.state == SessionState::Connected {
            warn!(client_id = %self.client_id, "Broker connection lost");
            self.state = SessionState::Disconnected;
        }

        let span = crate::session_span!(
            client_id = %self.client_id,
            host = %self.endpoint.host,
            port = self.endpoint.port
        );
        self.connect_cycle(clock).instrument(span).await
    }

    async fn connect_cycle(&mut self, clock: &dyn Clock) -> Result<ConnectReport, SessionError> {
        let mut report = ConnectReport::already_connected();

        loop {
            report.attempts += 1;
            self.state = SessionState::Connecting;
            debug!(attempt = report.attempts, "Connecting to broker");

            match self.attempt(clock).await {
                Ok(()) => {
                    self.state = SessionState::Connected;
                    info!(
                        attempt = report.attempts,
                        waited_ms = report.waited.as_millis() as u64,
                        "Connected to broker"
                    );
                    self.subscribe_device_topics().await;
                    return Ok(report);
                }
                Err(e) => {
                    self.state = SessionState::Disconnected;
                    warn!(
                        attempt = report.attempts,
                        error = %sanitize_error_message(&e.to_string()),
                        "Connection attempt failed"
                    );
                }
            }

            match self.policy.decide(report.attempts) {
                RetryDecision::RetryAfter(delay) => {
                    debug!(delay_ms = delay.as_millis() as u64, "Waiting before next attempt");
                    tokio::time::sleep(delay).await;
                    report.waited += delay;
                }
                RetryDecision::GiveUp => {
                    return Err(SessionError::RetriesExhausted {
                        attempts: report.attempts,
                    });
                }
            }
        }
    }

    /// One connection attempt with a token signed for the current epoch time
    async fn attempt(&mut self, clock: &dyn Clock) -> Result<(), SessionError> {
        let token = self
            .signer
            .sign(clock.now_epoch_seconds(), &self.identity)?;

        self.transport
            .connect(
                &self.endpoint.host,
                self.endpoint.port,
                &self.client_id,
                token.as_str(),
            )
            .await?;
        Ok(())
    }

    /// Subscribe to the config and command topics; failures are only logged
    async fn subscribe_device_topics(&mut self) {
        let subscriptions = [
            (self.identity.config_topic(), QoS::AtLeastOnce),
            (self.identity.commands_filter(), QoS::AtMostOnce),
        ];

        for (topic, qos) in subscriptions {
            match self.transport.subscribe(&topic, qos).await {
                Ok(()) => debug!(topic = %topic, qos = ?qos, "Subscribed"),
                Err(e) => warn!(topic = %topic, error = %e, "Subscription failed"),
            }
        }
    }

    /// Publish a status heartbeat on the state topic
    pub async fn publish_status(&mut self, status: &StatusRecord) -> Result<(), SessionError> {
        let topic = self.identity.state_topic();
        self.publish_json(&topic, status).await
    }

    /// Publish a telemetry record on the events topic
    pub async fn publish_telemetry(&mut self, record: &TelemetryRecord) -> Result<(), SessionError> {
        let topic = self.identity.events_topic();
        self.publish_json(&topic, record).await
    }

    async fn publish_json<M: Serialize>(&mut self, topic: &str, message: &M) -> Result<(), SessionError> {
        self.note_liveness();
        if self.state != SessionState::Connected {
            return Err(SessionError::NotConnected { state: self.state });
        }

        let payload = serde_json::to_vec(message)?;
        let len = payload.len();

        if let Err(e) = self.transport.publish(topic, payload).await {
            self.note_liveness();
            return Err(e.into());
        }

        debug!(topic = %topic, len = len, "Published");
        Ok(())
    }

    /// Service the connection and drain messages received since the last poll
    pub async fn poll(&mut self) -> Vec<InboundMessage> {
        if self.state != SessionState::Connected {
            return Vec::new();
        }
        let messages = self.transport.poll().await;
        self.note_liveness();
        messages
    }

    /// Route an inbound message, yielding a config update when it carries one
    pub fn route(&self, message: &InboundMessage) -> Option<ConfigUpdate> {
        match MessageHandler::route(&self.identity, message) {
            InboundRoute::Config(update) => Some(update),
            InboundRoute::Command { topic } => {
                info!(topic = %topic, len = message.payload.len(), "Command received");
                None
            }
            InboundRoute::Ignored => None,
        }
    }

    /// Disconnect cleanly
    pub async fn shutdown(&mut self) {
        if self.transport.is_connected() {
            self.transport.disconnect().await;
        }
        self.state = SessionState::Disconnected;
        info!(client_id = %self.client_id, "Session closed");
    }

    fn note_liveness(&mut self) {
        if self.state == SessionState::Connected && !self.transport.is_connected() {
            warn!(client_id = %self.client_id, "Broker connection lost");
            self.state = SessionState::Disconnected;
        }
    }
}
