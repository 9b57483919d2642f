//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod cancel_request;
pub mod outbound_gate;
pub mod relay_engine;
pub mod relay_session;
pub mod run_relay;
pub mod session_registry;
