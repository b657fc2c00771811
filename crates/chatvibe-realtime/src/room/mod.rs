//! Rooms and their member sets.

pub mod registry;
pub mod room;

pub use registry::RoomRegistry;
pub use room::Room;
