//! Agent controller
//!
//! One cooperative loop owns all mutable state. Each step performs, in order:
//! the connection check (reconnecting if needed), inbound polling with config
//! updates applied, and the scheduler's due-action evaluation with the
//! resulting actions executed immediately.

use super::config_store::{ConfigStore, IntervalKind};
use super::scheduler::{ScheduledAction, Scheduler};
use super::telemetry::TelemetryBuffer;
use crate::auth::CredentialSigner;
use crate::clock::Clock;
use crate::config::AgentConfig;
use crate::error::AgentResult;
use crate::protocol::{StatusRecord, TelemetryRecord};
use crate::sensor::EnvironmentSensor;
use crate::session::{ConnectReport, SessionManager};
use crate::transport::Transport;
use tracing::{debug, info, warn, Instrument};

/// Everything the controller mutates between steps
#[derive(Debug, Clone)]
pub struct AgentState {
    pub config: ConfigStore,
    pub telemetry: TelemetryBuffer,
    pub scheduler: Scheduler,
}

impl AgentState {
    pub fn new(config: ConfigStore, now_ms: u64) -> Self {
        Self {
            config,
            telemetry: TelemetryBuffer::new(),
            scheduler: Scheduler::new(now_ms),
        }
    }
}

/// What happened during one controller step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub connect: ConnectReport,
    pub messages: usize,
    pub intervals_updated: usize,
    pub actions: Vec<ScheduledAction>,
}

/// The telemetry agent: session, sensor, clock and scheduling state
pub struct Agent<T, S, C, E>
where
    T: Transport,
    S: CredentialSigner,
    C: Clock,
    E: EnvironmentSensor,
{
    session: SessionManager<T, S>,
    clock: C,
    sensor: E,
    state: AgentState,
}

impl<T, S, C, E> Agent<T, S, C, E>
where
    T: Transport,
    S: CredentialSigner,
    C: Clock,
    E: EnvironmentSensor,
{
    /// Create the agent with its timers starting now
    pub fn new(session: SessionManager<T, S>, clock: C, sensor: E, config: ConfigStore) -> Self {
        let state = AgentState::new(config, clock.now_monotonic_millis());
        Self {
            session,
            clock,
            sensor,
            state,
        }
    }

    /// Wire an agent from startup configuration and injected collaborators
    pub fn from_config(
        config: &AgentConfig,
        transport: T,
        signer: S,
        clock: C,
        sensor: E,
    ) -> AgentResult<Self> {
        let session = SessionManager::new(
            config.identity(),
            config.broker_endpoint()?,
            transport,
            signer,
            config.retry_policy(),
        );
        Ok(Self::new(
            session,
            clock,
            sensor,
            ConfigStore::from_schedule(&config.schedule),
        ))
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn session(&self) -> &SessionManager<T, S> {
        &self.session
    }

    /// Bring up the sensor. Failure here is fatal for the process.
    pub fn initialize(&mut self) -> AgentResult<()> {
        self.sensor.begin()?;
        info!(
            client_id = %self.session.client_id(),
            sampling_ms = self.state.config.get(IntervalKind::Sampling),
            status_ms = self.state.config.get(IntervalKind::Status),
            telemetry_ms = self.state.config.get(IntervalKind::Telemetry),
            "Agent initialized"
        );
        Ok(())
    }

    /// Run one pass of the control loop
    pub async fn step(&mut self) -> AgentResult<StepReport> {
        let connect = self.session.ensure_connected(&self.clock).await?;

        let inbound = self.session.poll().await;
        let mut intervals_updated = 0;
        for message in &inbound {
            if let Some(update) = self.session.route(message) {
                intervals_updated += self.state.config.apply_update(&update);
            }
        }

        let now_ms = self.clock.now_monotonic_millis();
        let actions = self.state.scheduler.tick(now_ms, &self.state.config);

        if !actions.is_empty() {
            let span = crate::tick_span!(now_ms = now_ms, actions = actions.len());
            self.execute(&actions).instrument(span).await?;
        }

        Ok(StepReport {
            connect,
            messages: inbound.len(),
            intervals_updated,
            actions,
        })
    }

    async fn execute(&mut self, actions: &[ScheduledAction]) -> AgentResult<()> {
        for action in actions {
            match *action {
                ScheduledAction::Sample => self.sample(),
                ScheduledAction::PublishStatus {
                    next_telemetry_update_ms,
                } => self.publish_status(next_telemetry_update_ms).await?,
                ScheduledAction::PublishTelemetry => self.publish_telemetry().await?,
            }
        }
        Ok(())
    }

    fn sample(&mut self) {
        let record = TelemetryRecord::capture(&mut self.sensor, self.clock.now_epoch_seconds());
        debug!(
            timestamp = record.timestamp,
            temperature = record.temperature,
            humidity = record.humidity,
            "Sampled sensors"
        );
        self.state.telemetry.store(record);
    }

    async fn publish_status(&mut self, next_telemetry_update_ms: i64) -> AgentResult<()> {
        self.session.ensure_connected(&self.clock).await?;

        let status = StatusRecord {
            timestamp: self.clock.now_epoch_seconds(),
            next_telemetry_update: next_telemetry_update_ms,
        };
        match self.session.publish_status(&status).await {
            Ok(()) => info!(next_telemetry_update_ms, "Status published"),
            Err(e) => warn!(error = %e, "Status publish failed"),
        }
        Ok(())
    }

    /// Publish the latest sample to the events topic
    ///
    /// Until the first sample exists the tick is consumed without publishing,
    /// so the broker never receives an all-zero telemetry document.
    async fn publish_telemetry(&mut self) -> AgentResult<()> {
        let Some(record) = self.state.telemetry.latest().cloned() else {
            info!("Telemetry due before the first sample; skipping");
            return Ok(());
        };

        self.session.ensure_connected(&self.clock).await?;

        match self.session.publish_telemetry(&record).await {
            Ok(()) => info!(timestamp = record.timestamp, "Telemetry published"),
            Err(e) => warn!(error = %e, "Telemetry publish failed"),
        }
        Ok(())
    }

    /// Run the control loop until the session gives up
    ///
    /// With an unbounded retry policy this never returns.
    pub async fn run(&mut self) -> AgentResult<()> {
        info!(client_id = %self.session.client_id(), "Agent loop starting");
        loop {
            self.step().await?;
            tokio::task::yield_now().await;
        }
    }

    /// Close the broker session
    pub async fn shutdown(&mut self) {
        self.session.shutdown().await;
        info!("Agent stopped");
    }
}
