//! Relay error types

use crate::protocol::ProtocolError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Relay error type
///
/// Only the two handshake variants ever reach a client, as an HTTP error before the
/// upgrade. Everything else is resolved locally by dropping the affected connection.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Handshake without a username
    #[error("Username is required")]
    EmptyIdentity,

    /// Username collides (case-insensitively) with an active connection
    #[error("Username already taken: {0}")]
    DuplicateIdentity(String),

    /// Read or write failure on an established connection
    #[error("Transport failure: {0}")]
    TransportFailure(#[from] TransportError),

    /// Recipient's outbound queue was full
    #[error("Outbound queue full for {0}")]
    SlowConsumerOverflow(String),

    /// Directed message names nobody who is online
    #[error("No active connection for {0}")]
    UnroutableRecipient(String),
}

impl RelayError {
    /// Get HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::EmptyIdentity => StatusCode::BAD_REQUEST,
            Self::DuplicateIdentity(_) => StatusCode::CONFLICT,
            Self::TransportFailure(_)
            | Self::SlowConsumerOverflow(_)
            | Self::UnroutableRecipient(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for responses and logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyIdentity => "EMPTY_IDENTITY",
            Self::DuplicateIdentity(_) => "DUPLICATE_IDENTITY",
            Self::TransportFailure(_) => "TRANSPORT_FAILURE",
            Self::SlowConsumerOverflow(_) => "SLOW_CONSUMER_OVERFLOW",
            Self::UnroutableRecipient(_) => "UNROUTABLE_RECIPIENT",
        }
    }
}

/// Error body returned for rejected handshakes
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl From<&RelayError> for ErrorBody {
    fn from(err: &RelayError) -> Self {
        Self {
            code: err.error_code().to_string(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = ?self, "Relay error reached HTTP surface");
        }

        (status, Json(ErrorBody::from(&self))).into_response()
    }
}

/// Failures of the underlying full-duplex channel
#[derive(Debug, Error)]
pub enum TransportError {
    /// The socket reported an error
    #[error("Socket error: {0}")]
    Socket(String),

    /// A frame kind the relay does not speak
    #[error("Unsupported frame: {0}")]
    UnsupportedFrame(&'static str),

    /// A text frame that is not a valid message
    #[error(transparent)]
    Malformed(#[from] ProtocolError),
}

impl TransportError {
    /// Wrap any displayable socket error
    pub fn socket(err: impl fmt::Display) -> Self {
        Self::Socket(err.to_string())
    }
}

/// Why a connection left the `Active` state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Peer closed the socket or the stream ended
    PeerClosed,
    /// A read or write on the transport failed
    TransportFailure,
    /// Outbound queue overflowed
    SlowConsumer,
    /// Explicit logout
    Logout,
    /// WebSocket upgrade failed after registration
    UpgradeFailed,
}

impl DisconnectReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PeerClosed => "peer_closed",
            Self::TransportFailure => "transport_failure",
            Self::SlowConsumer => "slow_consumer",
            Self::Logout => "logout",
            Self::UpgradeFailed => "upgrade_failed",
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relay result type
pub type RelayResult<T> = Result<T, RelayError>;
