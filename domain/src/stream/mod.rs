//! Upstream stream domain.
//!
//! - [`decoder::LineDecoder`]: reassembles lines from arbitrarily split bytes
//! - [`chunk::StreamChunk`]: one classified provider line

pub mod chunk;
pub mod decoder;
