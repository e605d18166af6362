//! Connection pumps
//!
//! Each connection runs two tasks for its lifetime. The outbound pump owns the write
//! half of the transport and drains the outbound queue into it; the inbound pump owns
//! the read half and hands every frame to the router. They share no transport state,
//! only the connection's shutdown signal.

use super::Connection;
use crate::error::{DisconnectReason, RelayError, RelayResult, TransportError};
use crate::protocol::{Message, ProtocolError};
use crate::routing::MessageRouter;
use crate::server::Relay;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Drain the outbound queue into the transport
///
/// Stops on the first write failure (no retry), when the connection is closed, or
/// when the queue is exhausted. A failed write deregisters the connection before the
/// write half is released.
pub async fn outbound_pump<W>(
    relay: Arc<Relay>,
    connection: Arc<Connection>,
    mut outbound: mpsc::Receiver<Message>,
    mut sink: W,
) -> RelayResult<()>
where
    W: Sink<String> + Unpin,
    W::Error: Display,
{
    let result = loop {
        let message = tokio::select! {
            biased;
            () = connection.closed() => break Ok(()),
            next = outbound.recv() => match next {
                Some(message) => message,
                None => break Ok(()),
            },
        };

        let frame = match message.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(
                    session_id = %connection.session_id(),
                    kind = message.kind(),
                    error = %e,
                    "Failed to encode outbound message"
                );
                continue;
            }
        };

        if let Err(e) = sink.send(frame).await {
            tracing::warn!(
                session_id = %connection.session_id(),
                username = %connection.username(),
                error = %e,
                "Failed to write to transport"
            );
            relay.disconnect(&connection, DisconnectReason::TransportFailure);
            break Err(RelayError::from(TransportError::socket(e)));
        }
    };

    outbound.close();
    let _ = sink.close().await;

    tracing::trace!(session_id = %connection.session_id(), "Outbound pump stopped");

    result
}

/// Read frames from the transport and route them
///
/// A read failure or end of stream is the disconnect signal: the connection is
/// deregistered before this returns and the read half is dropped.
pub async fn inbound_pump<R>(
    relay: Arc<Relay>,
    connection: Arc<Connection>,
    mut stream: R,
) -> RelayResult<()>
where
    R: Stream<Item = Result<String, TransportError>> + Unpin,
{
    let (result, reason) = loop {
        let next = tokio::select! {
            biased;
            () = connection.closed() => break (Ok(()), None),
            next = stream.next() => next,
        };

        let text = match next {
            Some(Ok(text)) => text,
            Some(Err(e)) => break (Err(RelayError::from(e)), Some(DisconnectReason::TransportFailure)),
            None => break (Ok(()), Some(DisconnectReason::PeerClosed)),
        };

        match Message::from_json(&text) {
            Ok(message) => MessageRouter::route(&relay, &connection, message),
            Err(ProtocolError::UnknownType(kind)) => {
                tracing::debug!(
                    session_id = %connection.session_id(),
                    kind = %kind,
                    "Ignoring message of unknown type"
                );
            }
            Err(e) => {
                tracing::debug!(
                    session_id = %connection.session_id(),
                    error = %e,
                    "Failed to parse message"
                );
                break (
                    Err(RelayError::from(TransportError::from(e))),
                    Some(DisconnectReason::TransportFailure),
                );
            }
        }
    };

    if let Some(reason) = reason {
        relay.disconnect(&connection, reason);
    }

    tracing::trace!(session_id = %connection.session_id(), "Inbound pump stopped");

    result
}
