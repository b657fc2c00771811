//! Durable, ordered, per-room message log.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::{Identity, Message, RoomId};

/// History window used when the caller does not choose one.
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Hard cap on a single history read.
pub const MAX_HISTORY_LIMIT: i64 = 200;

/// Clamp a requested history size into `[1, MAX_HISTORY_LIMIT]`.
pub fn clamp_history_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_HISTORY_LIMIT)
}

/// Append-only message log shared by the global room and pairwise rooms.
#[async_trait]
pub trait MessageStore: Send + Sync + 'static {
    /// Validate and persist a message, returning the fully populated record.
    ///
    /// The write is durable before this returns. Fails with a validation
    /// error for empty or oversized text or a recipient that does not fit
    /// the room, and with a storage error when the write fails.
    async fn append(
        &self,
        room: &RoomId,
        sender: &Identity,
        recipient: Option<&Identity>,
        text: &str,
    ) -> AppResult<Message>;

    /// Up to `limit` most recent messages of `room`, oldest first.
    ///
    /// `limit` is clamped with [`clamp_history_limit`].
    async fn recent_messages(&self, room: &RoomId, limit: i64) -> AppResult<Vec<Message>>;
}
