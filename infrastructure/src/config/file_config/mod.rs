//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod backpressure;
mod control;
mod host;
mod upstream;

pub use backpressure::FileBackpressureConfig;
pub use control::FileControlConfig;
pub use host::{FileHostConfig, FileLoggingConfig};
pub use upstream::FileUpstreamConfig;

use relay_application::RelayParams;
use relay_domain::{HealthThresholds, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("control.url cannot be empty")]
    EmptyControlUrl,

    #[error("control.reconnect_delay_secs cannot be 0")]
    InvalidReconnectDelay,

    #[error("upstream.endpoint cannot be empty")]
    EmptyUpstreamEndpoint,

    #[error("upstream.idle_timeout_secs cannot be 0")]
    InvalidIdleTimeout,

    #[error("backpressure.soft_queue_depth ({soft}) exceeds hard_queue_depth ({hard})")]
    QueueDepthOrder { soft: usize, hard: usize },

    #[error("retry.base_delay_ms ({base}) exceeds max_delay_ms ({max})")]
    RetryDelayOrder { base: u64, max: u64 },
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Coordinator connection
    pub control: FileControlConfig,
    /// Upstream provider
    pub upstream: FileUpstreamConfig,
    /// Retry defaults for requests that omit them
    pub retry: RetryPolicy,
    /// Empty-response thresholds
    pub health: HealthThresholds,
    /// Queue-depth backpressure and background batching
    pub backpressure: FileBackpressureConfig,
    /// Host visibility
    pub host: FileHostConfig,
    /// Log outputs
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();

        if self.control.url.trim().is_empty() {
            issues.push(ConfigValidationError::EmptyControlUrl);
        }
        if self.control.reconnect_delay_secs == 0 {
            issues.push(ConfigValidationError::InvalidReconnectDelay);
        }
        if self.upstream.endpoint.trim().is_empty() {
            issues.push(ConfigValidationError::EmptyUpstreamEndpoint);
        }
        if self.upstream.idle_timeout_secs == 0 {
            issues.push(ConfigValidationError::InvalidIdleTimeout);
        }
        if self.backpressure.soft_queue_depth > self.backpressure.hard_queue_depth {
            issues.push(ConfigValidationError::QueueDepthOrder {
                soft: self.backpressure.soft_queue_depth,
                hard: self.backpressure.hard_queue_depth,
            });
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            issues.push(ConfigValidationError::RetryDelayOrder {
                base: self.retry.base_delay_ms,
                max: self.retry.max_delay_ms,
            });
        }

        issues
    }

    /// Application parameters for the relay use case.
    pub fn relay_params(&self) -> RelayParams {
        RelayParams::default()
            .with_retry(self.retry.clone())
            .with_health(self.health.clone())
            .with_backpressure(self.backpressure.to_params())
            .with_idle_timeout(Duration::from_secs(self.upstream.idle_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> FileConfig {
        let mut config = FileConfig::default();
        config.upstream.endpoint = "https://provider.test/stream/{session_id}".to_string();
        config
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[control]
url = "ws://coordinator:9000/ws"
reconnect_delay_secs = 2

[upstream]
endpoint = "https://provider.test/stream/{session_id}"
idle_timeout_secs = 60

[upstream.headers]
cookie = "token=abc"

[retry]
max_retries = 3
show_retry_info = true

[health]
min_total_bytes = 64

[backpressure]
batch_debounce_ms = 50

[host]
start_backgrounded = true

[logging]
events_file = "/tmp/relay-events.jsonl"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.control.url, "ws://coordinator:9000/ws");
        assert_eq!(config.control.reconnect_delay_secs, 2);
        assert_eq!(config.upstream.headers["cookie"], "token=abc");
        assert_eq!(config.upstream.connect_timeout_secs, 30);
        assert_eq!(config.retry.max_retries, 3);
        assert!(config.retry.show_retry_info);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.health.min_total_bytes, 64);
        assert_eq!(config.health.min_elapsed_ms, 200);
        assert_eq!(config.backpressure.batch_debounce_ms, 50);
        assert!(config.host.start_backgrounded);
        assert!(config.logging.dir.is_none());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config, FileConfig::default());
        assert_eq!(config.control.url, "ws://127.0.0.1:5102/ws");
    }

    #[test]
    fn test_default_requires_endpoint() {
        assert_eq!(
            FileConfig::default().validate(),
            vec![ConfigValidationError::EmptyUpstreamEndpoint]
        );
        assert!(valid().validate().is_empty());
    }

    #[test]
    fn test_validation_collects_all_issues() {
        let mut config = valid();
        config.control.url = " ".to_string();
        config.control.reconnect_delay_secs = 0;
        config.upstream.idle_timeout_secs = 0;
        config.backpressure.soft_queue_depth = 500;
        config.retry.base_delay_ms = 60_000;

        let issues = config.validate();
        assert_eq!(issues.len(), 5);
        assert!(issues.contains(&ConfigValidationError::QueueDepthOrder {
            soft: 500,
            hard: 256
        }));
        assert!(issues.contains(&ConfigValidationError::RetryDelayOrder {
            base: 60_000,
            max: 30_000
        }));
    }

    #[test]
    fn test_relay_params_conversion() {
        let mut config = valid();
        config.upstream.idle_timeout_secs = 42;
        config.backpressure.hard_pause_ms = 75;
        let params = config.relay_params();
        assert_eq!(params.idle_timeout, Duration::from_secs(42));
        assert_eq!(params.backpressure.hard_pause, Duration::from_millis(75));
        assert_eq!(params.retry, RetryPolicy::default());
    }
}
