//! Time sources for the agent
//!
//! The scheduler runs on a monotonic millisecond counter while credentials and
//! published records carry wall-clock epoch seconds. Both come from a [`Clock`]
//! so tests can drive time by hand.

use std::sync::Arc;
use std::time::Instant;

/// Wall-clock and monotonic time provider
pub trait Clock: Send + Sync {
    /// Current wall-clock time as seconds since the Unix epoch
    fn now_epoch_seconds(&self) -> u64;

    /// Milliseconds elapsed on a monotonic counter
    fn now_monotonic_millis(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_epoch_seconds(&self) -> u64 {
        (**self).now_epoch_seconds()
    }

    fn now_monotonic_millis(&self) -> u64 {
        (**self).now_monotonic_millis()
    }
}

/// Clock backed by the host system
#[derive(Debug, Clone)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_epoch_seconds(&self) -> u64 {
        // Clamp pre-epoch clocks (unsynchronised RTC) to zero
        u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
    }

    fn now_monotonic_millis(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}
