//! Presence broadcasting
//!
//! Distributes membership changes to every live connection.

mod presence;

pub use presence::PresenceBroadcaster;
