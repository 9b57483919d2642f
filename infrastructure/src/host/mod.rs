//! Host visibility source.

pub mod signals;

pub use signals::{set_visibility, visibility_channel, watch_signals};
