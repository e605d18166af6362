//! # relay-gateway
//!
//! Real-time message relay: directed chat between named WebSocket clients and a live
//! view of who is online.

pub mod broadcast;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod routing;
pub mod server;

pub use error::{DisconnectReason, RelayError, RelayResult, TransportError};
pub use server::{create_app, run, GatewayState, Relay};
