//! Retry policy for empty or transiently failed upstream attempts.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff policy carried with every forward-request.
///
/// Delay before retry `n` (0-based) is `min(base_delay_ms * 2^n, max_delay_ms)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Whether empty/transient attempts are retried at all.
    pub enabled: bool,
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay_ms: u64,
    /// Upper bound for any single delay.
    pub max_delay_ms: u64,
    /// Send a `retry_info` notice to the Coordinator before each retry.
    pub show_retry_info: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 5,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            show_retry_info: false,
        }
    }
}

impl RetryPolicy {
    /// Whether another attempt may follow after `retry_count` retries.
    pub fn allows_retry(&self, retry_count: u32) -> bool {
        self.enabled && retry_count < self.max_retries
    }

    /// Backoff delay before the retry that follows `retry_count` retries.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let factor = 2u64.checked_pow(retry_count).unwrap_or(u64::MAX);
        let delay_ms = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }

    /// Total attempts this policy permits, first attempt included.
    pub fn max_attempts(&self) -> u32 {
        if self.enabled {
            self.max_retries.saturating_add(1)
        } else {
            1
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_delays(mut self, base_ms: u64, max_ms: u64) -> Self {
        self.base_delay_ms = base_ms;
        self.max_delay_ms = max_ms;
        self
    }

}

/// Partial retry settings as sent by the Coordinator.
///
/// Omitted fields fall back to the locally configured [`RetryPolicy`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOverrides {
    pub enabled: Option<bool>,
    pub max_retries: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub show_retry_info: Option<bool>,
}

impl RetryOverrides {
    pub fn apply_to(&self, base: &RetryPolicy) -> RetryPolicy {
        RetryPolicy {
            enabled: self.enabled.unwrap_or(base.enabled),
            max_retries: self.max_retries.unwrap_or(base.max_retries),
            base_delay_ms: self.base_delay_ms.unwrap_or(base.base_delay_ms),
            max_delay_ms: self.max_delay_ms.unwrap_or(base.max_delay_ms),
            show_retry_info: self.show_retry_info.unwrap_or(base.show_retry_info),
        }
    }
}
