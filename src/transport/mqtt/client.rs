//! Impure I/O operations for the MQTT client
//!
//! This module wraps rumqttc's client and event loop behind the
//! [`Transport`] trait. Once the broker accepts a connection the event loop
//! is moved into its own task, which forwards inbound publishes over a
//! channel and flags the connection as lost when the loop fails. `poll` only
//! drains that channel, so it never drops an `EventLoop::poll` future
//! mid-read.

use super::connection::{
    configure_mqtt_options, to_rumqttc_qos, ConnectionSettings, MqttError,
};
use crate::config::MqttSection;
use crate::transport::{InboundMessage, QoS, Transport, TransportError};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, Packet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Capacity of the request channel between client handle and event loop
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// Capacity of the channel carrying inbound publishes to `poll`
const INBOUND_CHANNEL_CAPACITY: usize = 100;

/// MQTT transport for the device session
pub struct MqttClient {
    settings: ConnectionSettings,
    client: Option<AsyncClient>,
    inbound: Option<mpsc::Receiver<InboundMessage>>,
    event_loop_handle: Option<JoinHandle<()>>,
    connected: Arc<AtomicBool>,
}

impl MqttClient {
    pub fn new(config: &MqttSection) -> Result<Self, MqttError> {
        Ok(Self::with_settings(ConnectionSettings::from_config(config)?))
    }

    pub fn with_settings(settings: ConnectionSettings) -> Self {
        Self {
            settings,
            client: None,
            inbound: None,
            event_loop_handle: None,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Drive a fresh event loop until the broker answers the CONNECT
    async fn wait_for_connack(event_loop: &mut EventLoop) -> Result<(), TransportError> {
        loop {
            match event_loop.poll().await {
                // rumqttc turns a refused CONNACK into ConnectionError::ConnectionRefused
                Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                Ok(_) => continue,
                Err(e) => return Err(TransportError::Rejected(e.to_string())),
            }
        }
    }

    /// Own the event loop until the connection fails
    ///
    /// The loop is never polled again after an error: rumqttc would silently
    /// reconnect with the old, possibly expired token, and a fresh token is
    /// needed instead.
    async fn drive_event_loop(
        mut event_loop: EventLoop,
        inbound: mpsc::Sender<InboundMessage>,
        connected: Arc<AtomicBool>,
    ) {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    debug!(topic = %publish.topic, len = publish.payload.len(), "Received MQTT message");
                    let message = InboundMessage::new(publish.topic, publish.payload.to_vec());
                    if inbound.send(message).await.is_err() {
                        debug!("Inbound receiver dropped; stopping MQTT event loop");
                        break;
                    }
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    warn!("MQTT broker closed the connection");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "MQTT connection lost");
                    break;
                }
            }
        }
        connected.store(false, Ordering::SeqCst);
    }

    /// Drop the current connection without notifying the broker
    fn discard_connection(&mut self) {
        if let Some(handle) = self.event_loop_handle.take() {
            handle.abort();
        }
        self.client = None;
        self.inbound = None;
        self.connected.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MqttClient {
    async fn connect(
        &mut self,
        host: &str,
        port: u16,
        client_id: &str,
        password: &str,
    ) -> Result<(), TransportError> {
        self.discard_connection();

        let options = configure_mqtt_options(host, port, client_id, password, &self.settings);
        let (client, mut event_loop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);

        debug!(host = %host, port = port, client_id = %client_id, "Opening MQTT connection");

        match timeout(
            self.settings.connect_timeout,
            Self::wait_for_connack(&mut event_loop),
        )
        .await
        {
            Ok(Ok(())) => {
                info!(host = %host, port = port, "MQTT broker accepted connection");
                // A task from an earlier connection must not clear this flag
                let connected = Arc::new(AtomicBool::new(true));
                let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
                self.event_loop_handle = Some(tokio::spawn(Self::drive_event_loop(
                    event_loop,
                    inbound_tx,
                    connected.clone(),
                )));
                self.client = Some(client);
                self.inbound = Some(inbound_rx);
                self.connected = connected;
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(TransportError::Timeout(self.settings.connect_timeout)),
        }
    }

    async fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), TransportError> {
        let client = self.client.as_ref().ok_or(TransportError::NotConnected)?;
        client
            .subscribe(topic, to_rumqttc_qos(qos))
            .await
            .map_err(|e| TransportError::SubscribeFailed(format!("{topic}: {e}")))
    }

    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let client = self.client.as_ref().ok_or(TransportError::NotConnected)?;
        client
            .publish(topic, rumqttc::QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| TransportError::PublishFailed(format!("{topic}: {e}")))
    }

    async fn poll(&mut self) -> Vec<InboundMessage> {
        let mut inbox = Vec::new();
        let Some(inbound) = self.inbound.as_mut() else {
            return inbox;
        };

        // Read before draining so messages forwarded ahead of a loss are kept
        let lost = !self.connected.load(Ordering::SeqCst);

        if let Ok(Some(message)) = timeout(self.settings.poll_window, inbound.recv()).await {
            inbox.push(message);
        }
        while let Ok(message) = inbound.try_recv() {
            inbox.push(message);
        }

        if lost {
            self.discard_connection();
        }

        inbox
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&mut self) {
        if let Some(client) = self.client.as_ref() {
            if let Err(e) = client.disconnect().await {
                debug!(error = %e, "MQTT disconnect request failed");
            }
        }
        if let Some(handle) = self.event_loop_handle.as_mut() {
            // Give the event loop a moment to flush the DISCONNECT packet
            let _ = timeout(self.settings.poll_window, handle).await;
        }
        self.discard_connection();
        info!("MQTT client disconnected");
    }
}
