//! Live interval settings

use crate::config::ScheduleSection;
use crate::protocol::ConfigUpdate;
use std::fmt;
use tracing::{info, warn};

/// Default sampling interval in milliseconds
pub const DEFAULT_SAMPLING_MS: i64 = 60_000;
/// Default status interval in milliseconds
pub const DEFAULT_STATUS_MS: i64 = 600_000;
/// Default telemetry interval in milliseconds
pub const DEFAULT_TELEMETRY_MS: i64 = 600_000;

/// One of the three configurable intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalKind {
    Sampling,
    Status,
    Telemetry,
}

impl IntervalKind {
    pub const ALL: [IntervalKind; 3] = [
        IntervalKind::Sampling,
        IntervalKind::Status,
        IntervalKind::Telemetry,
    ];
}

impl fmt::Display for IntervalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntervalKind::Sampling => "sampling",
            IntervalKind::Status => "status",
            IntervalKind::Telemetry => "telemetry",
        };
        f.write_str(name)
    }
}

/// Current intervals, in milliseconds
///
/// Values are not range-checked. Zero or negative intervals are stored as
/// given and make the corresponding action fire on every tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    sampling_ms: i64,
    status_ms: i64,
    telemetry_ms: i64,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    pub fn new() -> Self {
        Self {
            sampling_ms: DEFAULT_SAMPLING_MS,
            status_ms: DEFAULT_STATUS_MS,
            telemetry_ms: DEFAULT_TELEMETRY_MS,
        }
    }

    pub fn from_schedule(schedule: &ScheduleSection) -> Self {
        Self {
            sampling_ms: schedule.sampling_ms,
            status_ms: schedule.status_ms,
            telemetry_ms: schedule.telemetry_ms,
        }
    }

    pub fn get(&self, kind: IntervalKind) -> i64 {
        match kind {
            IntervalKind::Sampling => self.sampling_ms,
            IntervalKind::Status => self.status_ms,
            IntervalKind::Telemetry => self.telemetry_ms,
        }
    }

    fn slot(&mut self, kind: IntervalKind) -> &mut i64 {
        match kind {
            IntervalKind::Sampling => &mut self.sampling_ms,
            IntervalKind::Status => &mut self.status_ms,
            IntervalKind::Telemetry => &mut self.telemetry_ms,
        }
    }

    /// Overwrite every interval present in `update`, returning how many were set
    pub fn apply_update(&mut self, update: &ConfigUpdate) -> usize {
        let fields = [
            (IntervalKind::Sampling, update.sampling_ms),
            (IntervalKind::Status, update.status_ms),
            (IntervalKind::Telemetry, update.telemetry_ms),
        ];

        let mut applied = 0;
        for (kind, value) in fields {
            let Some(interval_ms) = value else {
                continue;
            };
            if interval_ms <= 0 {
                warn!(interval = %kind, interval_ms, "Non-positive interval applied; action will fire every tick");
            }
            let previous = std::mem::replace(self.slot(kind), interval_ms);
            info!(interval = %kind, previous_ms = previous, interval_ms, "Interval updated");
            applied += 1;
        }
        applied
    }
}
