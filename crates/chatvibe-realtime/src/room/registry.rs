//! Room registry: creates rooms on first join and drops them when emptied.

use std::sync::Arc;

use dashmap::DashMap;

use chatvibe_core::types::RoomId;

use super::room::Room;

/// Registry of all rooms that currently have members.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    /// Room ID → Room.
    rooms: DashMap<RoomId, Arc<Room>>,
}

impl RoomRegistry {
    /// Creates a new room registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the room, creating it if absent.
    ///
    /// The caller must check [`RoomMembers::is_retired`] after locking and
    /// retry on a retired room.
    ///
    /// [`RoomMembers::is_retired`]: super::room::RoomMembers::is_retired
    pub fn get_or_create(&self, id: &RoomId) -> Arc<Room> {
        self.rooms
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Room::new(id.clone())))
            .clone()
    }

    /// Returns the room if it exists.
    pub fn get(&self, id: &RoomId) -> Option<Arc<Room>> {
        self.rooms.get(id).map(|entry| entry.value().clone())
    }

    /// Drops `room` from the registry unless it was already replaced.
    ///
    /// Call only while holding the room lock with the room empty and
    /// marked retired.
    pub fn remove_if_same(&self, room: &Arc<Room>) {
        self.rooms
            .remove_if(&room.id, |_, current| Arc::ptr_eq(current, room));
    }

    /// Returns total number of rooms with members.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
