//! Domain layer for stream-relay
//!
//! This crate contains the relay's rules and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Relay session
//!
//! A Coordinator-issued request, identified by a [`RequestId`], is streamed
//! from an upstream provider back over the control channel. Each attempt is
//! judged by a [`HealthVerdict`]; empty attempts are retried under a
//! [`RetryPolicy`].
//!
//! ## Stream lines
//!
//! Provider output is line oriented. [`LineDecoder`] reassembles lines from
//! raw bytes and [`StreamChunk`] classifies them per participant.

pub mod core;
pub mod health;
pub mod relay;
pub mod stream;

// Re-export commonly used types
pub use core::{
    error::DomainError,
    host::HostVisibility,
    request_id::RequestId,
    string::{preview, truncate_at_boundary},
};
pub use health::verdict::{EmptySignal, HealthEvidence, HealthThresholds, HealthVerdict};
pub use relay::{
    command::{ForwardRequest, RelayCommand},
    output::{RelayOutput, RetryNotice},
    payload::{MessageTemplate, PayloadError, RelayPayload, Route, RoutingMode},
    retry::{RetryOverrides, RetryPolicy},
};
pub use stream::{
    chunk::{ChunkKind, Participant, StreamChunk},
    decoder::LineDecoder,
};
