//! Upstream provider adapters.

pub mod http;

pub use http::{HttpUpstreamError, HttpUpstreamProvider};
