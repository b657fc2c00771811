//! Inbound and outbound WebSocket event definitions.

use serde::{Deserialize, Serialize};

use chatvibe_core::error::AppError;
use chatvibe_core::types::{Identity, Message, RoomId};

/// Room addressed by a client: the global room, or a direct conversation
/// named by its counterpart.
///
/// Serialized as `"global"` or `{"direct": "<identity>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomTarget {
    /// The shared room.
    Global,
    /// A two-party conversation with the named counterpart.
    Direct(String),
}

/// Events sent by the client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Bind an identity to this connection.
    Authenticate {
        /// Account name.
        username: String,
        /// Plaintext password.
        password: String,
    },
    /// Join a room and receive its recent history.
    JoinRoom {
        /// Room to join.
        target: RoomTarget,
    },
    /// Leave a room.
    LeaveRoom {
        /// Room to leave.
        target: RoomTarget,
    },
    /// Post a message to a joined room.
    SendMessage {
        /// Destination room.
        target: RoomTarget,
        /// Message text.
        text: String,
    },
    /// Signal that the user is typing.
    Typing {
        /// Room being typed in.
        target: RoomTarget,
    },
}

/// Events sent by the server to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// Recent messages of a room just joined, oldest first.
    HistoryLoaded {
        /// Room ID.
        room: RoomId,
        /// Replayed messages.
        messages: Vec<Message>,
    },
    /// A message persisted to a joined room.
    MessageReceived {
        /// Room ID.
        room: RoomId,
        /// The stored message.
        message: Message,
    },
    /// Another member is typing.
    TypingIndicator {
        /// Room ID.
        room: RoomId,
        /// Who is typing.
        from: Identity,
    },
    /// The online set changed.
    PresenceChanged {
        /// Online identities, sorted.
        online: Vec<Identity>,
    },
    /// A request from this connection failed.
    Error {
        /// Error code.
        code: String,
        /// Error description.
        message: String,
    },
}

impl From<&AppError> for OutboundEvent {
    fn from(err: &AppError) -> Self {
        Self::Error {
            code: err.code(),
            message: err.message.clone(),
        }
    }
}
