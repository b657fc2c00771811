//! Seam traits implemented by the storage and authentication crates.

pub mod message_store;
pub mod session_bridge;

pub use message_store::MessageStore;
pub use session_bridge::SessionBridge;
