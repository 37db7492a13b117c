//! Hub wire protocol (JSON hub protocol, version 1).
//!
//! Every message is a JSON object terminated by the ASCII record separator
//! (0x1E); one websocket text frame may carry several. The connection opens
//! with a handshake request answered by an empty object (or an `error`).
//! After that, messages carry a numeric `type`.

use crate::error::TransportError;
use serde::{Deserialize, Serialize};

/// Terminates every hub message.
pub const RECORD_SEPARATOR: char = '\u{1e}';

const TYPE_INVOCATION: u64 = 1;
const TYPE_PING: u64 = 6;
const TYPE_CLOSE: u64 = 7;

/// First message sent by the client.
#[derive(Debug, Serialize)]
pub struct HandshakeRequest {
    pub protocol: &'static str,
    pub version: u32,
}

impl Default for HandshakeRequest {
    fn default() -> Self {
        Self {
            protocol: "json",
            version: 1,
        }
    }
}

/// Server reply to the handshake. An empty object means accepted.
#[derive(Debug, Default, Deserialize)]
pub struct HandshakeResponse {
    #[serde(default)]
    pub error: Option<String>,
}

/// Messages received from the hub.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    /// Server-to-client method call.
    Invocation {
        target: String,
        arguments: Vec<serde_json::Value>,
    },
    /// Keep-alive.
    Ping,
    /// Server is closing the connection.
    Close {
        error: Option<String>,
        allow_reconnect: bool,
    },
    /// Any other message type; ignored by this client.
    Other(u64),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvocationFields {
    target: String,
    #[serde(default)]
    arguments: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloseFields {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    allow_reconnect: bool,
}

impl HubMessage {
    /// Parse one message (without its record separator).
    pub fn parse(message: &str) -> Result<Self, TransportError> {
        let value: serde_json::Value = serde_json::from_str(message)
            .map_err(|e| TransportError::Protocol(format!("invalid json: {e}")))?;
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| TransportError::Protocol("message has no numeric type".into()))?;

        match kind {
            TYPE_INVOCATION => {
                let fields: InvocationFields = serde_json::from_value(value)
                    .map_err(|e| TransportError::Protocol(format!("invalid invocation: {e}")))?;
                Ok(HubMessage::Invocation {
                    target: fields.target,
                    arguments: fields.arguments,
                })
            }
            TYPE_PING => Ok(HubMessage::Ping),
            TYPE_CLOSE => {
                let fields: CloseFields = serde_json::from_value(value)
                    .map_err(|e| TransportError::Protocol(format!("invalid close: {e}")))?;
                Ok(HubMessage::Close {
                    error: fields.error,
                    allow_reconnect: fields.allow_reconnect,
                })
            }
            other => Ok(HubMessage::Other(other)),
        }
    }
}

/// Split a text frame into its messages.
pub fn split_messages(frame: &str) -> impl Iterator<Item = &str> {
    frame
        .split(RECORD_SEPARATOR)
        .filter(|part| !part.trim().is_empty())
}

/// Serialize a message and append the record separator.
pub fn encode<T: Serialize>(message: &T) -> Result<String, TransportError> {
    let mut text =
        serde_json::to_string(message).map_err(|e| TransportError::Protocol(e.to_string()))?;
    text.push(RECORD_SEPARATOR);
    Ok(text)
}

/// Keep-alive message sent by the client.
pub fn ping() -> String {
    format!("{{\"type\":{TYPE_PING}}}{RECORD_SEPARATOR}")
}

/// Parse the handshake reply, failing if the server reported an error.
pub fn parse_handshake(message: &str) -> Result<(), TransportError> {
    let response: HandshakeResponse = serde_json::from_str(message)
        .map_err(|e| TransportError::Handshake(format!("invalid handshake reply: {e}")))?;
    match response.error {
        Some(error) => Err(TransportError::Handshake(error)),
        None => Ok(()),
    }
}
