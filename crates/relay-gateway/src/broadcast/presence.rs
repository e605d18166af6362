//! Presence broadcaster
//!
//! Pushes the online list to every connection whenever membership changes.

use crate::connection::{Connection, Registry};
use crate::protocol::{Message, OnlineUser};
use std::sync::Arc;

/// Computes the online list and fans it out
#[derive(Debug, Clone)]
pub struct PresenceBroadcaster {
    registry: Arc<Registry>,
}

impl PresenceBroadcaster {
    /// Create a broadcaster over a registry
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Send the current presence list to everyone, the triggering connection included
    ///
    /// Best effort: a connection whose queue is full or closed is skipped, its own
    /// pumps deal with it. Returns how many connections accepted the update.
    pub fn broadcast(&self) -> usize {
        let connections = self.registry.snapshot_connections();
        let users = connections.iter().map(|c| c.username().to_string()).collect();

        let sent = Self::fan_out(&connections, &Message::presence(users));

        tracing::debug!(
            online = connections.len(),
            sent = sent,
            "Presence broadcast"
        );

        sent
    }

    /// Tell everyone still online that `username` has left
    pub fn announce_departure(&self, username: &str) -> usize {
        let connections = self.registry.snapshot_connections();
        let sent = Self::fan_out(&connections, &Message::logout(username));

        tracing::trace!(username = %username, sent = sent, "Departure announced");

        sent
    }

    /// Read-only presence query; never triggers a broadcast
    pub fn online_users(&self) -> Vec<OnlineUser> {
        self.registry
            .snapshot_usernames()
            .into_iter()
            .map(OnlineUser::new)
            .collect()
    }

    fn fan_out(connections: &[Arc<Connection>], message: &Message) -> usize {
        let mut sent = 0;

        for conn in connections {
            match conn.try_send(message.clone()) {
                Ok(()) => sent += 1,
                Err(e) => {
                    tracing::trace!(
                        session_id = %conn.session_id(),
                        kind = message.kind(),
                        error = %e,
                        "Skipping connection during broadcast"
                    );
                }
            }
        }

        sent
    }
}
