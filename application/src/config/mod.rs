//! Application-level configuration.
//!
//! - [`RelayParams`]: static parameters of the relay loop (retry defaults,
//!   health thresholds, idle timeout, backpressure)

pub mod relay_params;

pub use relay_params::{BackpressureParams, RelayParams};
