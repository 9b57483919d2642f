//! Relay parameters: use case loop control.
//!
//! [`RelayParams`] groups the static parameters consumed by
//! [`RunRelayUseCase`](crate::use_cases::run_relay::RunRelayUseCase).
//! Per-request retry overrides are applied on top of `retry`.

use relay_domain::{HealthThresholds, RetryPolicy};
use std::time::Duration;

/// Queue-depth backpressure and background batching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackpressureParams {
    /// Above this depth each send is followed by a yield.
    pub soft_queue_depth: usize,
    /// Above this depth the relay pauses before the next chunk.
    pub hard_queue_depth: usize,
    pub hard_pause: Duration,
    /// Debounce window for batching while the host is backgrounded.
    pub batch_debounce: Duration,
}

impl Default for BackpressureParams {
    fn default() -> Self {
        Self {
            soft_queue_depth: 64,
            hard_queue_depth: 256,
            hard_pause: Duration::from_millis(50),
            batch_debounce: Duration::from_millis(30),
        }
    }
}

/// Relay loop control parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayParams {
    /// Retry policy used for fields a forward-request leaves unset.
    pub retry: RetryPolicy,
    pub health: HealthThresholds,
    pub backpressure: BackpressureParams,
    /// Longest silence tolerated between two upstream reads.
    pub idle_timeout: Duration,
}

impl Default for RelayParams {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            health: HealthThresholds::default(),
            backpressure: BackpressureParams::default(),
            idle_timeout: Duration::from_secs(360),
        }
    }
}

impl RelayParams {
    // ==================== Builder Methods ====================

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_health(mut self, health: HealthThresholds) -> Self {
        self.health = health;
        self
    }

    pub fn with_backpressure(mut self, backpressure: BackpressureParams) -> Self {
        self.backpressure = backpressure;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_batch_debounce(mut self, debounce: Duration) -> Self {
        self.backpressure.batch_debounce = debounce;
        self
    }
}
