//! Reconnect policy.
//!
//! Bounded exponential backoff applied after an established connection is
//! lost. Without a policy a lost session stays `Failed`.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Default delay before the first reconnect attempt.
const DEFAULT_BASE_DELAY_MS: u64 = 750;

/// Default ceiling for the backoff delay.
const DEFAULT_MAX_DELAY_MS: u64 = 8_000;

/// Default number of attempts before giving up.
const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Exponent cap; keeps the multiplier from overflowing.
const MAX_EXPONENT: u32 = 6;

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Backoff parameters for reconnecting a lost session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Delay before the first attempt, in milliseconds.
    pub base_delay_ms: u64,

    /// Upper bound for any single delay, in milliseconds.
    pub max_delay_ms: u64,

    /// Attempts before giving up; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
        }
    }
}

impl ReconnectPolicy {
    /// Sets the base delay.
    #[inline]
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Sets the maximum delay.
    #[inline]
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Sets the attempt limit.
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: Option<u32>) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Returns the delay before attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(MAX_EXPONENT);
        let multiplier = 2_u64.saturating_pow(exponent);
        let candidate = self.base_delay_ms.saturating_mul(multiplier);
        Duration::from_millis(candidate.min(self.max_delay_ms))
    }

    /// Returns `true` if attempt number `attempt` is allowed.
    #[inline]
    #[must_use]
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt <= max)
    }
}

// ============================================================================
// Tests
// ============================================================================
