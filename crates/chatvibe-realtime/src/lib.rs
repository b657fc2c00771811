//! # chatvibe-realtime
//!
//! Real-time WebSocket hub for ChatVibe. Provides:
//!
//! - Per-connection state machine (unauthenticated, authenticated, disconnected)
//! - Rooms: the shared global room and symmetric two-party conversations
//! - History replay on join and ordered fan-out of persisted messages
//! - Presence tracking with online-set broadcasts
//! - Typing indicators

pub mod connection;
pub mod hub;
pub mod message;
pub mod metrics;
pub mod presence;
pub mod room;
pub mod server;

pub use connection::handle::{ConnectionHandle, ConnectionId};
pub use hub::RealtimeHub;
pub use message::types::{InboundEvent, OutboundEvent, RoomTarget};
pub use presence::registry::PresenceRegistry;
pub use server::RealtimeEngine;
