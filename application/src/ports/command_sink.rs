//! Command sink port
//!
//! The control channel decodes frames into [`RelayCommand`]s and hands them
//! to a sink. Dispatch must not block the reader: long-running work is
//! spawned.

use relay_domain::RelayCommand;

pub trait CommandSink: Send + Sync {
    fn dispatch(&self, command: RelayCommand);
}
