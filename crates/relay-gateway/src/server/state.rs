//! Gateway state
//!
//! Application state for the relay's HTTP/WebSocket server.

use super::Relay;
use relay_common::RelaySettings;
use std::sync::Arc;

/// Gateway application state
///
/// Holds all shared dependencies for the server.
#[derive(Clone)]
pub struct GatewayState {
    /// Registry, routing and presence
    relay: Arc<Relay>,
}

impl GatewayState {
    /// Create a new gateway state with a fresh relay
    pub fn new(settings: &RelaySettings) -> Self {
        Self {
            relay: Relay::new(settings),
        }
    }

    /// Get the relay
    pub fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("relay", &self.relay)
            .finish()
    }
}
