//! Domain types shared by every ChatVibe layer.

pub mod identity;
pub mod message;
pub mod room;

pub use identity::Identity;
pub use message::Message;
pub use room::{ConversationKey, RoomId, derive_key};
