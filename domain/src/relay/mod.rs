//! Relay request domain.
//!
//! - [`payload::RelayPayload`]: what the Coordinator asks us to stream, and its validation
//! - [`retry::RetryPolicy`]: bounded exponential backoff for empty/transient attempts
//! - [`output::RelayOutput`]: everything a session may send back to the Coordinator
//! - [`command::RelayCommand`]: commands arriving over the control channel

pub mod command;
pub mod output;
pub mod payload;
pub mod retry;
