//! Real-time hub configuration.

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) hub configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Number of recent messages replayed to a connection joining a room.
    #[serde(default = "default_history_window")]
    pub history_window: i64,
    /// Capacity of each connection's outbound event queue. Events beyond
    /// this are dropped for that connection.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer_size: usize,
    /// Maximum message length in code points.
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
    /// Maximum size of a single inbound frame in bytes. Must leave room for
    /// `max_message_chars` written entirely as `\uXXXX\uXXXX` escapes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            outbound_buffer_size: default_outbound_buffer(),
            max_message_chars: default_max_message_chars(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

fn default_history_window() -> i64 {
    50
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_max_message_chars() -> usize {
    crate::types::message::MAX_MESSAGE_CHARS
}

/// Worst-case JSON encoding of one code point: an escaped surrogate pair.
const ESCAPED_CHAR_BYTES: usize = 12;

/// Room for the event envelope around the message text.
const FRAME_ENVELOPE_BYTES: usize = 4096;

fn default_max_frame_bytes() -> usize {
    default_max_message_chars() * ESCAPED_CHAR_BYTES + FRAME_ENVELOPE_BYTES
}
