//! Relay core
//!
//! Composes the registry, router and presence broadcaster. The only place that
//! creates or tears down connections.

use crate::broadcast::PresenceBroadcaster;
use crate::connection::{inbound_pump, outbound_pump, Connection, Registration, Registry};
use crate::error::{DisconnectReason, RelayError, RelayResult, TransportError};
use crate::protocol::OnlineUser;
use futures_util::{Sink, Stream};
use relay_common::RelaySettings;
use std::fmt::Display;
use std::sync::Arc;

/// Shared relay state, handed to every task by `Arc`
pub struct Relay {
    registry: Arc<Registry>,
    presence: PresenceBroadcaster,
}

impl Relay {
    /// Create a relay with an empty registry
    #[must_use]
    pub fn new(settings: &RelaySettings) -> Arc<Self> {
        let registry = Arc::new(Registry::new(settings.outbound_queue_capacity));
        let presence = PresenceBroadcaster::new(registry.clone());

        Arc::new(Self { registry, presence })
    }

    /// Get the registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Validate a handshake identity and register it
    ///
    /// Rejections leave the registry untouched.
    pub fn admit(&self, username: &str) -> RelayResult<Registration> {
        if username.is_empty() {
            tracing::info!("Rejected connection without username");
            return Err(RelayError::EmptyIdentity);
        }

        match self.registry.register(username) {
            Ok(registration) => {
                tracing::info!(
                    session_id = %registration.connection.session_id(),
                    username = %username,
                    "Connection admitted"
                );
                Ok(registration)
            }
            Err(e) => {
                tracing::info!(username = %username, error = %e, "Connection rejected");
                Err(e)
            }
        }
    }

    /// Run both pumps for an admitted connection until it is fully closed
    ///
    /// Everyone, the newcomer included, receives the updated presence list once the
    /// pumps are running.
    pub async fn run_session<W, R>(self: Arc<Self>, registration: Registration, sink: W, stream: R)
    where
        W: Sink<String> + Send + Unpin + 'static,
        W::Error: Display,
        R: Stream<Item = Result<String, TransportError>> + Send + Unpin + 'static,
    {
        let Registration {
            connection,
            outbound,
        } = registration;
        let session_id = connection.session_id().to_string();

        let outbound_task = tokio::spawn(outbound_pump(
            self.clone(),
            connection.clone(),
            outbound,
            sink,
        ));
        let inbound_task = tokio::spawn(inbound_pump(self.clone(), connection.clone(), stream));

        self.presence.broadcast();

        let (inbound_result, outbound_result) = tokio::join!(inbound_task, outbound_task);

        for (pump, result) in [("inbound", inbound_result), ("outbound", outbound_result)] {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::debug!(session_id = %session_id, pump = pump, error = %e, "Pump ended with error");
                }
                Err(e) => {
                    tracing::error!(session_id = %session_id, pump = pump, error = %e, "Pump task failed");
                }
            }
        }

        // A panicked pump may have skipped its own cleanup
        self.disconnect(&connection, DisconnectReason::TransportFailure);
        connection.mark_closed();

        tracing::info!(
            session_id = %session_id,
            username = %connection.username(),
            age_ms = connection.age().as_millis(),
            "Session closed"
        );
    }

    /// Take a connection out of service
    ///
    /// Idempotent: only the first caller deregisters, closes the queue, and notifies
    /// the remaining connections. Returns whether this call did the work.
    pub fn disconnect(&self, connection: &Arc<Connection>, reason: DisconnectReason) -> bool {
        if !connection.begin_closing() {
            return false;
        }

        let evicted = self.registry.remove(connection.username());
        connection.close();

        tracing::info!(
            session_id = %connection.session_id(),
            username = %connection.username(),
            reason = %reason,
            "Connection closing"
        );

        if let Some(evicted) = evicted {
            evicted.close();
            self.presence.announce_departure(evicted.username());
            self.presence.broadcast();
        }

        true
    }

    /// Log a user out by name, as if they had sent a logout message
    pub fn logout(&self, username: &str) -> bool {
        match self.registry.lookup(username) {
            Some(connection) => self.disconnect(&connection, DisconnectReason::Logout),
            None => false,
        }
    }

    /// Current online identities; read-only
    pub fn online_users(&self) -> Vec<OnlineUser> {
        self.presence.online_users()
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("registry", &self.registry)
            .finish()
    }
}
