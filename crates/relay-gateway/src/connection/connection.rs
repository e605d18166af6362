//! Individual client connection
//!
//! Represents one live session: its identity, lifecycle state, and the producer end
//! of its bounded outbound queue.

use crate::protocol::Message;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

/// Connection state
///
/// Transitions only move forward; nothing re-enters `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Created, not yet visible in the registry
    Connecting,
    /// Registered and routable
    Active,
    /// Deregistered, pumps winding down
    Closing,
    /// Both pumps exited and the transport is released
    Closed,
}

/// A single client connection
pub struct Connection {
    /// Unique session ID
    session_id: String,

    /// Identity as supplied at registration (case preserved)
    username: String,

    /// Current lifecycle state
    state: RwLock<ConnectionState>,

    /// Producer end of the outbound queue
    sender: mpsc::Sender<Message>,

    /// Cancelled once the connection starts closing
    shutdown: CancellationToken,

    /// Connection creation time
    created_at: Instant,
}

impl Connection {
    /// Create a new connection in the `Connecting` state
    pub fn new(username: impl Into<String>, sender: mpsc::Sender<Message>) -> Arc<Self> {
        Arc::new(Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            username: username.into(),
            state: RwLock::new(ConnectionState::Connecting),
            sender,
            shutdown: CancellationToken::new(),
            created_at: Instant::now(),
        })
    }

    /// Get the session ID
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Get the username
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Get the current state
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Check if the connection is routable
    pub fn is_active(&self) -> bool {
        self.state() == ConnectionState::Active
    }

    /// `Connecting -> Active`
    pub fn activate(&self) -> bool {
        self.transition(&[ConnectionState::Connecting], ConnectionState::Active)
    }

    /// `Connecting | Active -> Closing`
    ///
    /// Returns `true` only for the caller that performed the transition, so
    /// teardown runs exactly once no matter how many paths race to it.
    pub fn begin_closing(&self) -> bool {
        self.transition(
            &[ConnectionState::Connecting, ConnectionState::Active],
            ConnectionState::Closing,
        )
    }

    /// `Closing -> Closed`
    pub fn mark_closed(&self) -> bool {
        self.transition(&[ConnectionState::Closing], ConnectionState::Closed)
    }

    fn transition(&self, from: &[ConnectionState], to: ConnectionState) -> bool {
        let mut state = self.state.write();
        if from.contains(&*state) {
            tracing::trace!(
                session_id = %self.session_id,
                username = %self.username,
                from = ?*state,
                to = ?to,
                "Connection state changed"
            );
            *state = to;
            true
        } else {
            false
        }
    }

    /// Try to enqueue a message (non-blocking)
    ///
    /// Fails with `Full` when the consumer has fallen behind and with `Closed` once
    /// the connection has been shut down.
    pub fn try_send(&self, message: Message) -> Result<(), TrySendError<Message>> {
        if self.shutdown.is_cancelled() {
            return Err(TrySendError::Closed(message));
        }
        self.sender.try_send(message)
    }

    /// Close the outbound queue and signal both pumps to stop
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    /// Check if the connection has been shut down
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.sender.is_closed()
    }

    /// Resolves once `close` has been called
    pub async fn closed(&self) {
        self.shutdown.cancelled().await;
    }

    /// Messages currently waiting in the outbound queue
    pub fn pending(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Get connection age
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session_id", &self.session_id)
            .field("username", &self.username)
            .field("state", &self.state())
            .field("created_at", &self.created_at)
            .finish()
    }
}
