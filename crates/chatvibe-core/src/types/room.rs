//! Room identifiers and conversation key derivation.
//!
//! A room is either the shared `global` room or a two-party conversation
//! whose key is derived symmetrically from its participants. The string
//! form is what gets persisted in the `messages.room_id` column.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::identity::Identity;

/// Storage key of the shared room.
pub const GLOBAL_ROOM: &str = "global";

/// Separator between the two escaped participants of a conversation key.
const SEPARATOR: char = '|';

/// Symmetric identifier of a two-party conversation.
///
/// Participants are kept in sorted order, so `derive(a, b) == derive(b, a)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    first: Identity,
    second: Identity,
}

impl ConversationKey {
    /// Derive the key for a pair of participants.
    pub fn derive(a: &Identity, b: &Identity) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self {
            first: first.clone(),
            second: second.clone(),
        }
    }

    /// Both participants, in sorted order.
    pub fn participants(&self) -> (&Identity, &Identity) {
        (&self.first, &self.second)
    }

    /// The other participant of the conversation, if `who` is one of them.
    ///
    /// A self-conversation returns `who` itself.
    pub fn counterpart_of(&self, who: &Identity) -> Option<&Identity> {
        if *who == self.first {
            Some(&self.second)
        } else if *who == self.second {
            Some(&self.first)
        } else {
            None
        }
    }

    /// Stable string form: both participants escaped, joined by `|`.
    pub fn as_key(&self) -> String {
        format!(
            "{}{SEPARATOR}{}",
            escape(self.first.as_str()),
            escape(self.second.as_str())
        )
    }

    /// Parse the string form produced by [`ConversationKey::as_key`].
    pub fn parse(key: &str) -> Result<Self, AppError> {
        let mut parts = key.split(SEPARATOR);
        let (Some(first), Some(second), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(AppError::validation(format!(
                "Malformed conversation key: '{key}'"
            )));
        };
        let first = Identity::new(unescape(first)?)?;
        let second = Identity::new(unescape(second)?)?;
        Ok(Self::derive(&first, &second))
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}

/// Typed room identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RoomId {
    /// The single shared room every authenticated user may join.
    Global,
    /// A pairwise conversation.
    Conversation(ConversationKey),
}

impl RoomId {
    /// Parse a persisted room identifier.
    pub fn parse(value: &str) -> Result<Self, AppError> {
        if value == GLOBAL_ROOM {
            return Ok(Self::Global);
        }
        ConversationKey::parse(value).map(Self::Conversation)
    }

    /// String form used for storage and on the wire.
    pub fn storage_key(&self) -> String {
        match self {
            Self::Global => GLOBAL_ROOM.to_string(),
            Self::Conversation(key) => key.as_key(),
        }
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

impl TryFrom<String> for RoomId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomId> for String {
    fn from(room: RoomId) -> String {
        room.storage_key()
    }
}

/// Derive the room of a two-party conversation from raw identity strings.
///
/// Symmetric and deterministic; fails only when either identity is empty.
pub fn derive_key(a: &str, b: &str) -> Result<RoomId, AppError> {
    let a = Identity::new(a)?;
    let b = Identity::new(b)?;
    Ok(RoomId::Conversation(ConversationKey::derive(&a, &b)))
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            SEPARATOR => out.push_str("%7C"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(escaped: &str) -> Result<String, AppError> {
    let mut out = String::with_capacity(escaped.len());
    let mut rest = escaped;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let code = rest.get(pos + 1..pos + 3);
        match code {
            Some("25") => out.push('%'),
            Some("7C") => out.push(SEPARATOR),
            _ => {
                return Err(AppError::validation(format!(
                    "Invalid escape sequence in conversation key: '{escaped}'"
                )));
            }
        }
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    Ok(out)
}
