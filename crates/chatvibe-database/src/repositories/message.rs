//! SQLite-backed message store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use chatvibe_core::error::{AppError, ErrorKind};
use chatvibe_core::result::AppResult;
use chatvibe_core::traits::message_store::{MessageStore, clamp_history_limit};
use chatvibe_core::types::message::{MAX_MESSAGE_CHARS, validate_text};
use chatvibe_core::types::{ConversationKey, Identity, Message, RoomId};

/// Row shape of the `messages` table.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    room_id: String,
    sender: String,
    recipient: Option<String>,
    body: String,
    created_at: i64,
}

impl TryFrom<MessageRow> for Message {
    type Error = AppError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let created_at = DateTime::<Utc>::from_timestamp_millis(row.created_at).ok_or_else(|| {
            AppError::storage(format!(
                "Message {} has an out-of-range timestamp {}",
                row.id, row.created_at
            ))
        })?;

        Ok(Message {
            id: row.id,
            room: RoomId::parse(&row.room_id)?,
            sender: Identity::new(row.sender)?,
            recipient: row.recipient.map(Identity::new).transpose()?,
            text: row.body,
            created_at,
        })
    }
}

/// Durable message log stored in the `messages` table.
///
/// Ids come from `AUTOINCREMENT`, so they are strictly increasing and never
/// reused. Each insert stamps `max(now, timestamp of the room's last row)` in
/// the same statement, keeping timestamps non-decreasing per room even if
/// the wall clock steps backwards.
#[derive(Debug, Clone)]
pub struct SqliteMessageStore {
    pool: SqlitePool,
    max_chars: usize,
}

impl SqliteMessageStore {
    /// Create a new message store.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            max_chars: MAX_MESSAGE_CHARS,
        }
    }

    /// Override the maximum message length in code points.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Number of messages stored for a room.
    pub async fn count(&self, room: &RoomId) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE room_id = ?1")
            .bind(room.storage_key())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to count messages", e))
    }
}

/// Check that the recipient fits the room: none for the global room, the
/// sender's counterpart for a conversation.
fn check_recipient(
    room: &RoomId,
    sender: &Identity,
    recipient: Option<&Identity>,
) -> AppResult<()> {
    match (room, recipient) {
        (RoomId::Global, None) => Ok(()),
        (RoomId::Global, Some(_)) => Err(AppError::validation(
            "Messages to the global room have no recipient",
        )),
        (RoomId::Conversation(_), None) => Err(AppError::validation(
            "Conversation messages require a recipient",
        )),
        (RoomId::Conversation(key), Some(recipient)) => {
            if ConversationKey::derive(sender, recipient) == *key {
                Ok(())
            } else {
                Err(AppError::validation(format!(
                    "Sender '{sender}' and recipient '{recipient}' do not belong to room '{key}'"
                )))
            }
        }
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn append(
        &self,
        room: &RoomId,
        sender: &Identity,
        recipient: Option<&Identity>,
        text: &str,
    ) -> AppResult<Message> {
        let text = validate_text(text, self.max_chars)?;
        check_recipient(room, sender, recipient)?;

        let row = sqlx::query_as::<_, MessageRow>(
            "INSERT INTO messages (room_id, sender, recipient, body, created_at) \
             VALUES (?1, ?2, ?3, ?4, \
                     MAX(?5, COALESCE((SELECT created_at FROM messages WHERE room_id = ?1 \
                                        ORDER BY id DESC LIMIT 1), ?5))) \
             RETURNING id, room_id, sender, recipient, body, created_at",
        )
        .bind(room.storage_key())
        .bind(sender.as_str())
        .bind(recipient.map(Identity::as_str))
        .bind(text)
        .bind(Utc::now().timestamp_millis())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to append message", e))?;

        debug!(room = %room, id = row.id, sender = %sender, "Message appended");
        row.try_into()
    }

    async fn recent_messages(&self, room: &RoomId, limit: i64) -> AppResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT id, room_id, sender, recipient, body, created_at FROM \
             (SELECT * FROM messages WHERE room_id = ?1 ORDER BY id DESC LIMIT ?2) \
             ORDER BY id ASC",
        )
        .bind(room.storage_key())
        .bind(clamp_history_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to load recent messages", e))?;

        rows.into_iter().map(Message::try_from).collect()
    }
}
