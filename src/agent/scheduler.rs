//! Multi-interval due-action evaluation
//!
//! The scheduler owns one timestamp per periodic action and decides, for a
//! given monotonic time, which actions are due. It performs no I/O; the
//! controller executes the returned actions in order.
//!
//! Each action is checked independently, in the fixed order sample, status,
//! telemetry. An action is due when the elapsed time since it last fired is
//! greater than or equal to its current interval. A due action fires once and
//! its timer is reset to the tick time, so a long stall never causes catch-up
//! bursts.

use super::config_store::{ConfigStore, IntervalKind};

/// An action that came due during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledAction {
    /// Capture a fresh set of readings
    Sample,
    /// Publish a status heartbeat
    PublishStatus {
        /// Telemetry interval minus time elapsed since the last telemetry
        /// publish, measured before this tick's telemetry check
        next_telemetry_update_ms: i64,
    },
    /// Publish the latest telemetry record
    PublishTelemetry,
}

/// Timers for the three periodic actions, in monotonic milliseconds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduler {
    last_sample: u64,
    last_status: u64,
    last_telemetry: u64,
}

impl Scheduler {
    /// Start every timer at `now_ms`
    pub fn new(now_ms: u64) -> Self {
        Self {
            last_sample: now_ms,
            last_status: now_ms,
            last_telemetry: now_ms,
        }
    }

    /// Time at which `kind` last fired, or the creation time if it never has
    pub fn last_fired(&self, kind: IntervalKind) -> u64 {
        match kind {
            IntervalKind::Sampling => self.last_sample,
            IntervalKind::Status => self.last_status,
            IntervalKind::Telemetry => self.last_telemetry,
        }
    }

    /// Evaluate all timers against the current intervals
    pub fn tick(&mut self, now_ms: u64, config: &ConfigStore) -> Vec<ScheduledAction> {
        let mut due = Vec::new();

        if elapsed(now_ms, self.last_sample) >= config.get(IntervalKind::Sampling) {
            due.push(ScheduledAction::Sample);
            self.last_sample = now_ms;
        }

        if elapsed(now_ms, self.last_status) >= config.get(IntervalKind::Status) {
            let next_telemetry_update_ms = config
                .get(IntervalKind::Telemetry)
                .saturating_sub(elapsed(now_ms, self.last_telemetry));
            due.push(ScheduledAction::PublishStatus {
                next_telemetry_update_ms,
            });
            self.last_status = now_ms;
        }

        if elapsed(now_ms, self.last_telemetry) >= config.get(IntervalKind::Telemetry) {
            due.push(ScheduledAction::PublishTelemetry);
            self.last_telemetry = now_ms;
        }

        due
    }
}

/// Milliseconds from `since` to `now`, never negative
fn elapsed(now: u64, since: u64) -> i64 {
    i64::try_from(now.saturating_sub(since)).unwrap_or(i64::MAX)
}
