//! Connection registry
//!
//! The single source of truth for who is online. One mutex guards the whole map;
//! it is held for the map operation only, never across I/O.

use super::Connection;
use crate::error::{RelayError, RelayResult};
use crate::protocol::Message;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A freshly registered connection and the consumer end of its outbound queue
#[derive(Debug)]
pub struct Registration {
    pub connection: Arc<Connection>,
    pub outbound: mpsc::Receiver<Message>,
}

/// Maps usernames to their active connection
///
/// Keys keep the case used at registration; uniqueness is enforced
/// case-insensitively.
pub struct Registry {
    connections: Mutex<BTreeMap<String, Arc<Connection>>>,
    queue_capacity: usize,
}

impl Registry {
    /// Create an empty registry whose connections get `queue_capacity`-deep outbound queues
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            connections: Mutex::new(BTreeMap::new()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Register a username, creating its connection
    ///
    /// Check and insert happen under the same lock, so two concurrent registrations of
    /// case-insensitively equal names cannot both succeed.
    pub fn register(&self, username: &str) -> RelayResult<Registration> {
        let folded = username.to_lowercase();
        let mut connections = self.connections.lock();

        if let Some(existing) = connections.keys().find(|k| k.to_lowercase() == folded) {
            tracing::debug!(
                username = %username,
                existing = %existing,
                "Username collides with active connection"
            );
            return Err(RelayError::DuplicateIdentity(username.to_string()));
        }

        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let connection = Connection::new(username, tx);
        connections.insert(username.to_string(), connection.clone());
        connection.activate();

        tracing::debug!(
            session_id = %connection.session_id(),
            username = %username,
            online = connections.len(),
            "Connection registered"
        );

        Ok(Registration {
            connection,
            outbound: rx,
        })
    }

    /// Remove a username, handing back the evicted connection
    ///
    /// The caller closes the connection after the lock is released.
    pub fn remove(&self, username: &str) -> Option<Arc<Connection>> {
        let removed = self.connections.lock().remove(username);

        if let Some(connection) = &removed {
            tracing::debug!(
                session_id = %connection.session_id(),
                username = %username,
                "Connection deregistered"
            );
        }

        removed
    }

    /// Exact-case lookup
    pub fn lookup(&self, username: &str) -> Option<Arc<Connection>> {
        self.connections.lock().get(username).cloned()
    }

    /// Current usernames, by value
    pub fn snapshot_usernames(&self) -> Vec<String> {
        self.connections.lock().keys().cloned().collect()
    }

    /// Current connections, by value
    pub fn snapshot_connections(&self) -> Vec<Arc<Connection>> {
        self.connections.lock().values().cloned().collect()
    }

    /// Check if a username is registered (exact case)
    pub fn contains(&self, username: &str) -> bool {
        self.connections.lock().contains_key(username)
    }

    /// Number of registered connections
    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    /// Check if nobody is online
    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }

    /// Capacity given to each new outbound queue
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("connections", &self.len())
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}
