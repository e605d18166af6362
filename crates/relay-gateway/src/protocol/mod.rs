//! Relay protocol definitions
//!
//! Defines the JSON frames exchanged over a client connection.

mod messages;
mod payloads;

pub use messages::{Message, ProtocolError};
pub use payloads::{OnlineUser, WireMessage, LOGOUT_TYPE};
