//! Host visibility state

use serde::{Deserialize, Serialize};

/// Whether the hosting context is currently in the foreground.
///
/// While backgrounded, outgoing fragments are batched instead of being sent
/// one by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostVisibility {
    #[default]
    Foreground,
    Background,
}

impl HostVisibility {
    pub fn is_background(self) -> bool {
        matches!(self, HostVisibility::Background)
    }
}
