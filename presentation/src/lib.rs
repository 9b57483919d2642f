//! Presentation layer for stream-relay
//!
//! This crate contains the CLI definitions.

pub mod cli;

// Re-export commonly used types
pub use cli::commands::Cli;
