//! Message routing
//!
//! Decides what happens to each inbound message once the sender is stamped on it.

use crate::connection::Connection;
use crate::error::{DisconnectReason, RelayError, RelayResult};
use crate::protocol::Message;
use crate::server::Relay;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;

/// Dispatch inbound client messages
pub struct MessageRouter;

impl MessageRouter {
    /// Route a message received from `sender`
    ///
    /// Chat goes to exactly one recipient. Nothing is ever echoed back to the sender,
    /// and the sender never learns whether delivery happened.
    pub fn route(relay: &Relay, sender: &Arc<Connection>, message: Message) {
        match message.stamped(sender.username()) {
            chat @ Message::Chat { .. } => match Self::deliver(relay, chat) {
                Ok(()) => {}
                Err(RelayError::UnroutableRecipient(to)) => {
                    tracing::debug!(
                        from = %sender.username(),
                        to = %to,
                        "Dropping message for unknown recipient"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        from = %sender.username(),
                        error = %e,
                        "Dropped message"
                    );
                }
            },
            Message::Logout { .. } => {
                tracing::debug!(
                    session_id = %sender.session_id(),
                    username = %sender.username(),
                    "Logout requested"
                );
                relay.disconnect(sender, DisconnectReason::Logout);
            }
            Message::PresenceList { .. } => {
                tracing::debug!(
                    session_id = %sender.session_id(),
                    "Ignoring presence list sent by client"
                );
            }
        }
    }

    /// Enqueue a chat message on its recipient's outbound queue
    ///
    /// A full queue means the recipient cannot keep up: it is dropped from the relay
    /// rather than buffered further or allowed to stall the sender.
    pub fn deliver(relay: &Relay, message: Message) -> RelayResult<()> {
        let to = match &message {
            Message::Chat { to, .. } => to.clone(),
            other => {
                tracing::debug!(kind = other.kind(), "Only chat messages are directed");
                return Ok(());
            }
        };

        let target = relay
            .registry()
            .lookup(&to)
            .ok_or_else(|| RelayError::UnroutableRecipient(to.clone()))?;

        match target.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                relay.disconnect(&target, DisconnectReason::SlowConsumer);
                Err(RelayError::SlowConsumerOverflow(to))
            }
            // Recipient is already on its way out
            Err(TrySendError::Closed(_)) => Ok(()),
        }
    }
}
