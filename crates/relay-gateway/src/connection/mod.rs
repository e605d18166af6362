//! Connection management
//!
//! Live connections, the registry that names them, and the pumps that move their
//! frames.

mod connection;
mod pump;
mod registry;

pub use connection::{Connection, ConnectionState};
pub use pump::{inbound_pump, outbound_pump};
pub use registry::{Registration, Registry};
