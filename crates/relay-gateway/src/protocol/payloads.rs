//! Wire payload definitions
//!
//! The JSON shapes that actually travel over the socket.

use serde::{Deserialize, Deserializer, Serialize};

/// Value of the `type` field on logout frames
pub const LOGOUT_TYPE: &str = "logout";

/// Flat envelope used for chat and control frames
///
/// Every field is optional on the wire and `null` reads as absent; empty strings
/// are omitted when encoding.
/// Chat frames carry no `type` at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Frame kind ("" for chat, "logout" for logout)
    #[serde(
        rename = "type",
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "String::is_empty"
    )]
    pub kind: String,

    /// Sender, stamped by the relay
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "String::is_empty"
    )]
    pub from: String,

    /// Recipient of a chat message
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "String::is_empty"
    )]
    pub to: String,

    /// Chat body
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "String::is_empty"
    )]
    pub content: String,

    /// Identity carried on logout notifications
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "String::is_empty"
    )]
    pub username: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// One entry of the presence list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OnlineUser {
    pub username: String,
}

impl OnlineUser {
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}
