//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod command_sink;
pub mod coordinator;
pub mod event_logger;
pub mod upstream;
