//! Mock implementations for testing
//!
//! Provides mock Transport, Clock, EnvironmentSensor and CredentialSigner
//! implementations so the session and scheduling logic can be exercised
//! without a broker, hardware or real time. Every mock is `Clone` and shares
//! its state between clones, so a test can keep a handle after moving the
//! mock into the component under test.

use crate::auth::{Claims, CredentialSigner, SigningError, Token};
use crate::clock::Clock;
use crate::protocol::Identity;
use crate::sensor::{EnvironmentSensor, SensorError};
use crate::transport::{InboundMessage, QoS, Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub type PublishedMessage = (String, Vec<u8>);

/// Arguments of one `Transport::connect` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectAttempt {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub password: String,
}

#[derive(Debug, Default)]
struct TransportState {
    connected: AtomicBool,
    fail_publishes: AtomicBool,
    disconnects: AtomicUsize,
    connect_script: Mutex<VecDeque<Result<(), TransportError>>>,
    connect_attempts: Mutex<Vec<ConnectAttempt>>,
    subscriptions: Mutex<Vec<(String, QoS)>>,
    published: Mutex<Vec<PublishedMessage>>,
    inbox: Mutex<Vec<InboundMessage>>,
}

/// Mock transport for testing
///
/// Connects succeed unless a scripted result says otherwise.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<TransportState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue results for the next connect calls, in order
    pub async fn script_connects(&self, results: Vec<Result<(), TransportError>>) {
        self.state.connect_script.lock().await.extend(results);
    }

    /// Queue a message to be returned by the next poll
    pub async fn push_inbound(&self, message: InboundMessage) {
        self.state.inbox.lock().await.push(message);
    }

    /// Simulate the broker dropping the connection
    pub fn drop_connection(&self) {
        self.state.connected.store(false, Ordering::SeqCst);
    }

    /// Make publishes fail and take the connection down with them
    pub fn fail_publishes_and_disconnect(&self, fail: bool) {
        self.state.fail_publishes.store(fail, Ordering::SeqCst);
    }

    pub async fn connect_attempts(&self) -> Vec<ConnectAttempt> {
        self.state.connect_attempts.lock().await.clone()
    }

    pub async fn subscriptions(&self) -> Vec<(String, QoS)> {
        self.state.subscriptions.lock().await.clone()
    }

    pub async fn published(&self) -> Vec<PublishedMessage> {
        self.state.published.lock().await.clone()
    }

    /// Published messages on a single topic
    pub async fn published_on(&self, topic: &str) -> Vec<Vec<u8>> {
        self.state
            .published
            .lock()
            .await
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub async fn clear_history(&self) {
        self.state.connect_attempts.lock().await.clear();
        self.state.subscriptions.lock().await.clear();
        self.state.published.lock().await.clear();
    }

    pub fn disconnect_count(&self) -> usize {
        self.state.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(
        &mut self,
        host: &str,
        port: u16,
        client_id: &str,
        password: &str,
    ) -> Result<(), TransportError> {
        self.state.connect_attempts.lock().await.push(ConnectAttempt {
            host: host.to_string(),
            port,
            client_id: client_id.to_string(),
            password: password.to_string(),
        });

        let result = self
            .state
            .connect_script
            .lock()
            .await
            .pop_front()
            .unwrap_or(Ok(()));

        self.state.connected.store(result.is_ok(), Ordering::SeqCst);
        if result.is_ok() {
            self.state.fail_publishes.store(false, Ordering::SeqCst);
        }
        result
    }

    async fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.state
            .subscriptions
            .lock()
            .await
            .push((topic.to_string(), qos));
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        if self.state.fail_publishes.load(Ordering::SeqCst) {
            self.drop_connection();
            return Err(TransportError::PublishFailed(format!(
                "{topic}: mock publish failure"
            )));
        }
        self.state
            .published
            .lock()
            .await
            .push((topic.to_string(), payload));
        Ok(())
    }

    async fn poll(&mut self) -> Vec<InboundMessage> {
        if !self.is_connected() {
            return Vec::new();
        }
        std::mem::take(&mut *self.state.inbox.lock().await)
    }

    fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&mut self) {
        self.state.disconnects.fetch_add(1, Ordering::SeqCst);
        self.drop_connection();
    }
}

/// Hand-driven clock
///
/// Wall-clock time is derived from the starting epoch plus the monotonic
/// counter, so both advance together. A clock built with
/// [`ManualClock::following_runtime`] also counts tokio time elapsed since
/// construction, so paused-time sleeps such as the reconnect backoff move it
/// forward.
#[derive(Debug, Clone)]
pub struct ManualClock {
    epoch_base: u64,
    millis: Arc<AtomicU64>,
    runtime_base: Option<Instant>,
}

impl ManualClock {
    /// Clock whose monotonic counter reads 0 at `epoch_seconds`
    pub fn new(epoch_seconds: u64) -> Self {
        Self {
            epoch_base: epoch_seconds,
            millis: Arc::new(AtomicU64::new(0)),
            runtime_base: None,
        }
    }

    /// Clock that also advances with tokio time
    ///
    /// Must be called inside a runtime. Under `start_paused` the reading
    /// stays exact.
    pub fn following_runtime(epoch_seconds: u64) -> Self {
        Self {
            runtime_base: Some(Instant::now()),
            ..Self::new(epoch_seconds)
        }
    }

    pub fn advance_millis(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance_millis(secs * 1000);
    }

    /// Jump the manual part of the counter to an absolute value
    pub fn set_millis(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    fn runtime_elapsed_millis(&self) -> u64 {
        self.runtime_base
            .map(|base| u64::try_from(base.elapsed().as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

impl Clock for ManualClock {
    fn now_epoch_seconds(&self) -> u64 {
        self.epoch_base + self.now_monotonic_millis() / 1000
    }

    fn now_monotonic_millis(&self) -> u64 {
        self.millis
            .load(Ordering::SeqCst)
            .saturating_add(self.runtime_elapsed_millis())
    }
}

/// Mock sensor with predictable readings
///
/// Temperature rises by 0.5 degrees with every sample so consecutive samples
/// are distinguishable; the other channels are constant.
#[derive(Debug, Clone, Default)]
pub struct MockSensor {
    samples: Arc<AtomicUsize>,
    should_fail: bool,
}

impl MockSensor {
    pub const BASE_TEMPERATURE: f32 = 20.0;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    /// Number of samples taken so far
    pub fn sample_count(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }
}

impl EnvironmentSensor for MockSensor {
    fn begin(&mut self) -> Result<(), SensorError> {
        if self.should_fail {
            Err(SensorError::InitFailed("Mock sensor not found".to_string()))
        } else {
            Ok(())
        }
    }

    fn read_temperature(&mut self) -> f32 {
        let taken = self.samples.fetch_add(1, Ordering::SeqCst);
        Self::BASE_TEMPERATURE + taken as f32 * 0.5
    }

    fn read_humidity(&mut self) -> f32 {
        45.0
    }

    fn read_pressure(&mut self) -> f32 {
        101.325
    }

    fn read_illuminance(&mut self) -> f32 {
        250.0
    }

    fn read_uva(&mut self) -> f32 {
        1.5
    }

    fn read_uvb(&mut self) -> f32 {
        0.75
    }

    fn read_uv_index(&mut self) -> f32 {
        2.0
    }
}

/// Signer that produces unique opaque tokens without cryptography
#[derive(Debug, Clone, Default)]
pub struct ScriptedSigner {
    calls: Arc<AtomicU32>,
    pending_failures: Arc<AtomicU32>,
}

impl ScriptedSigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` sign calls fail with `SigningUnavailable`
    pub fn fail_next(&self, count: u32) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CredentialSigner for ScriptedSigner {
    fn sign(&self, issued_at: u64, identity: &Identity) -> Result<Token, SigningError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        let failing = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SigningError::SigningUnavailable(
                "Mock key store unavailable".to_string(),
            ));
        }

        let claims = Claims::for_identity(identity, issued_at)?;
        Ok(Token::new(
            format!("mock.{}.{}.{call}", claims.aud, claims.iat),
            claims.iat,
            claims.exp,
        ))
    }
}
