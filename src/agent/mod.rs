//! Agent core: live intervals, telemetry buffer, scheduler and controller
//!
//! The controller in [`lifecycle`] owns an [`AgentState`] and drives the
//! broker session, the sensor and the scheduler from a single loop.

pub mod config_store;
pub mod lifecycle;
pub mod scheduler;
pub mod telemetry;

pub use config_store::{
    ConfigStore, IntervalKind, DEFAULT_SAMPLING_MS, DEFAULT_STATUS_MS, DEFAULT_TELEMETRY_MS,
};
pub use lifecycle::{Agent, AgentState, StepReport};
pub use scheduler::{ScheduledAction, Scheduler};
pub use telemetry::TelemetryBuffer;
