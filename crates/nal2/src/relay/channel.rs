//! Duplex channel handles and the messages carried over them.

use std::fmt;

use nal2_core::CallRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identity of one connected channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(Uuid);

impl ChannelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical role a channel registers for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum Role {
    /// Browser or other user-facing client
    #[serde(rename = "web")]
    #[strum(serialize = "web")]
    Frontend,
    /// Remote host running the engine
    #[serde(rename = "app")]
    #[strum(serialize = "app")]
    Engine,
}

/// Messages the gateway sends to a connected peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Registered { client: Role },
    ProcessInput { input: Value },
    ReceiveOutput { output: Value },
    Nal2Request { data: CallRequest },
    Error { message: String },
}

/// Messages a connected peer sends to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Register {
        client: Role,
    },
    SendToApp {
        #[serde(default)]
        input: Value,
    },
    SendToWeb {
        #[serde(default)]
        output: Value,
    },
    Nal2Response {
        sequence_num: i64,
        #[serde(default)]
        result: Value,
    },
}

/// The peer behind the handle is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelClosed;

/// Sending half of one connection.
///
/// The transport task owns the matching receiver and writes every message it
/// yields to the wire; dropping that receiver closes the handle.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    id: ChannelId,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ChannelHandle {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: ChannelId::new(),
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn send(&self, message: ServerMessage) -> Result<(), ChannelClosed> {
        self.tx.send(message).map_err(|_| ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_message_wire_format() {
        let register: ClientMessage =
            serde_json::from_value(json!({"type": "register", "client": "app"})).unwrap();
        assert_eq!(register, ClientMessage::Register { client: Role::Engine });

        let reply: ClientMessage = serde_json::from_value(json!({
            "type": "nal2_response",
            "sequence_num": 4,
            "result": {"return": 0}
        }))
        .unwrap();
        assert!(matches!(reply, ClientMessage::Nal2Response { sequence_num: 4, .. }));

        assert!(serde_json::from_value::<ClientMessage>(json!({"type": "register", "client": "tv"})).is_err());
    }

    #[test]
    fn test_server_message_wire_format() {
        let message = ServerMessage::Registered { client: Role::Frontend };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"type": "registered", "client": "web"})
        );

        let error = ServerMessage::Error {
            message: "engine not connected".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({"type": "error", "message": "engine not connected"})
        );
    }

    #[test]
    fn test_handle_closes_with_receiver() {
        let (handle, rx) = ChannelHandle::new();
        assert!(handle.send(ServerMessage::Error { message: "x".into() }).is_ok());
        drop(rx);
        assert_eq!(
            handle.send(ServerMessage::Error { message: "y".into() }),
            Err(ChannelClosed)
        );
    }
}
