//! Pure reconnection decision logic

use std::time::Duration;

/// Fixed backoff between connection attempts
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

/// Reconnection policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of failed attempts before giving up (None = unlimited)
    pub max_attempts: Option<u32>,
    /// Delay after each failed attempt
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None, // The device has no other way to reach the cloud
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Policy that gives up after `max_attempts` failures
    pub fn bounded(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            backoff,
        }
    }

    /// Decide what to do after `failed_attempts` consecutive failures (pure function)
    pub fn decide(&self, failed_attempts: u32) -> RetryDecision {
        if let Some(max_attempts) = self.max_attempts {
            if failed_attempts >= max_attempts {
                return RetryDecision::GiveUp;
            }
        }
        RetryDecision::RetryAfter(self.backoff)
    }
}

/// Decision result for a failed connection attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep, then attempt again
    RetryAfter(Duration),
    /// Stop trying
    GiveUp,
}
