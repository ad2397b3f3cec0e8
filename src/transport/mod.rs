//! Transport layer for the device session
//!
//! This module provides the pub/sub transport abstraction used by the session
//! manager, and the MQTT implementation of it.

use std::time::Duration;
use thiserror::Error;

pub mod mqtt;

/// Delivery guarantee requested for a subscription or publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    /// QoS 0 - at most once
    AtMostOnce,
    /// QoS 1 - at least once
    AtLeastOnce,
}

/// Message delivered by the broker on a subscribed topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Transport errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("Connection rejected: {0}")]
    Rejected(String),
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),
    #[error("Not connected")]
    NotConnected,
    #[error("Subscription failed: {0}")]
    SubscribeFailed(String),
    #[error("Publishing failed: {0}")]
    PublishFailed(String),
}

/// Secure pub/sub transport
///
/// This trait provides an abstraction over the broker connection so the
/// session logic can be exercised without a network.
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Open a new connection, replacing any previous one.
    /// Resolves once the broker has accepted or refused the connection.
    async fn connect(
        &mut self,
        host: &str,
        port: u16,
        client_id: &str,
        password: &str,
    ) -> Result<(), TransportError>;

    /// Subscribe to a topic filter
    async fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), TransportError>;

    /// Publish a payload to a topic
    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Service the connection and collect messages received since the last poll
    async fn poll(&mut self) -> Vec<InboundMessage>;

    /// Whether the connection is currently alive
    fn is_connected(&self) -> bool;

    /// Close the connection
    async fn disconnect(&mut self);
}
