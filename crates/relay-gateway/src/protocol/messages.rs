//! Relay message format
//!
//! The typed view of every frame exchanged between clients and the relay.

use super::{OnlineUser, WireMessage, LOGOUT_TYPE};
use serde::{Deserialize, Serialize};

/// A message exchanged between clients and the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Directed message from one identity to another
    Chat {
        from: String,
        to: String,
        content: String,
    },
    /// Logout request (client) or departure notice (server)
    Logout { username: String },
    /// Current online identities, in registry order
    PresenceList { users: Vec<String> },
}

/// Errors raised while decoding or encoding frames
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unknown message type: {0}")]
    UnknownType(String),
}

/// Shapes a single text frame can take on the wire
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum Frame {
    Presence(Vec<OnlineUser>),
    Envelope(WireMessage),
    /// A bare `null`, read as an envelope with every field absent
    Null,
}

impl Message {
    /// Create a chat message
    #[must_use]
    pub fn chat(from: impl Into<String>, to: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Chat {
            from: from.into(),
            to: to.into(),
            content: content.into(),
        }
    }

    /// Create a logout message
    #[must_use]
    pub fn logout(username: impl Into<String>) -> Self {
        Self::Logout {
            username: username.into(),
        }
    }

    /// Create a presence list
    #[must_use]
    pub fn presence(users: Vec<String>) -> Self {
        Self::PresenceList { users }
    }

    /// Overwrite whatever identity the client claimed with the one the relay knows
    #[must_use]
    pub fn stamped(self, sender: &str) -> Self {
        match self {
            Self::Chat { to, content, .. } => Self::Chat {
                from: sender.to_string(),
                to,
                content,
            },
            Self::Logout { .. } => Self::Logout {
                username: sender.to_string(),
            },
            presence @ Self::PresenceList { .. } => presence,
        }
    }

    /// Short name for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Chat { .. } => "chat",
            Self::Logout { .. } => LOGOUT_TYPE,
            Self::PresenceList { .. } => "presence",
        }
    }

    /// Serialize to a JSON text frame
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        let frame = match self {
            Self::Chat { from, to, content } => Frame::Envelope(WireMessage {
                from: from.clone(),
                to: to.clone(),
                content: content.clone(),
                ..Default::default()
            }),
            Self::Logout { username } => Frame::Envelope(WireMessage {
                kind: LOGOUT_TYPE.to_string(),
                username: username.clone(),
                ..Default::default()
            }),
            Self::PresenceList { users } => {
                Frame::Presence(users.iter().map(OnlineUser::new).collect())
            }
        };

        Ok(serde_json::to_string(&frame)?)
    }

    /// Parse a JSON text frame
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        match serde_json::from_str::<Frame>(text)? {
            Frame::Presence(users) => Ok(Self::PresenceList {
                users: users.into_iter().map(|u| u.username).collect(),
            }),
            Frame::Envelope(wire) => Self::from_wire(wire),
            Frame::Null => Self::from_wire(WireMessage::default()),
        }
    }

    fn from_wire(wire: WireMessage) -> Result<Self, ProtocolError> {
        match wire.kind.as_str() {
            "" => Ok(Self::Chat {
                from: wire.from,
                to: wire.to,
                content: wire.content,
            }),
            LOGOUT_TYPE => Ok(Self::Logout {
                username: wire.username,
            }),
            _ => Err(ProtocolError::UnknownType(wire.kind)),
        }
    }
}
