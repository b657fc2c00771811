//! Persisted chat message and text validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::identity::Identity;
use super::room::RoomId;

/// Maximum message length in code points.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// A message as stored and delivered.
///
/// Immutable once created. Within one room, ordering by `id` also orders
/// by non-decreasing `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Store-assigned, strictly increasing identifier.
    pub id: i64,
    /// Room the message was posted to.
    pub room: RoomId,
    /// Author.
    pub sender: Identity,
    /// The other participant; absent for the global room.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub recipient: Option<Identity>,
    /// Trimmed message text.
    pub text: String,
    /// Store-assigned creation time.
    pub created_at: DateTime<Utc>,
}

/// Validate message text and return its trimmed form.
///
/// Oversized text is rejected, never truncated.
pub fn validate_text(text: &str, max_chars: usize) -> Result<&str, AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("Message text is empty"));
    }
    let chars = trimmed.chars().count();
    if chars > max_chars {
        return Err(AppError::validation(format!(
            "Message text is {chars} characters, the limit is {max_chars}"
        )));
    }
    Ok(trimmed)
}
