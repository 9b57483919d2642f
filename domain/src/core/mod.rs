//! Core domain concepts shared across all subdomains.
//!
//! - [`request_id::RequestId`]: Coordinator-assigned identifier of a relayed request
//! - [`host::HostVisibility`]: whether the hosting context is foregrounded
//! - [`error::DomainError`]: domain-level errors

pub mod error;
pub mod host;
pub mod request_id;
pub mod string;
