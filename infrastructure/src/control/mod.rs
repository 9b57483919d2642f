//! Control channel adapter: the Coordinator connection.
//!
//! - [`protocol`]: JSON frame encoding and command decoding
//! - [`channel::ControlChannel`]: reconnecting WebSocket client implementing
//!   [`CoordinatorLink`](relay_application::CoordinatorLink)

pub mod channel;
pub mod protocol;

pub use channel::{ControlChannel, ControlError};
pub use protocol::{DONE_SENTINEL, IdentityAnnouncement, ProtocolError};
