//! Single room with its member set and serialization lock.

use std::collections::HashSet;

use tokio::sync::{Mutex, MutexGuard};

use chatvibe_core::types::RoomId;

use crate::connection::handle::ConnectionId;

/// Member set of a room, only reachable through the room lock.
#[derive(Debug, Default)]
pub struct RoomMembers {
    members: HashSet<ConnectionId>,
    /// Set once the room was emptied and dropped from the registry.
    retired: bool,
}

impl RoomMembers {
    /// Adds a member. Returns `false` if it already was one.
    pub fn insert(&mut self, conn_id: ConnectionId) -> bool {
        self.members.insert(conn_id)
    }

    /// Removes a member. Returns `false` if it was not one.
    pub fn remove(&mut self, conn_id: &ConnectionId) -> bool {
        self.members.remove(conn_id)
    }

    /// Whether the connection is a member.
    pub fn contains(&self, conn_id: &ConnectionId) -> bool {
        self.members.contains(conn_id)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the room has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterates over member connection IDs.
    pub fn iter(&self) -> impl Iterator<Item = &ConnectionId> {
        self.members.iter()
    }

    /// Whether this room instance was retired from the registry.
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    pub(crate) fn retire(&mut self) {
        self.retired = true;
    }
}

/// A room: the unit of ordered fan-out.
///
/// Join, leave, send and typing all run while holding [`Room::lock`], so
/// every member observes the room's events in the same order.
#[derive(Debug)]
pub struct Room {
    /// Room identifier.
    pub id: RoomId,
    members: Mutex<RoomMembers>,
}

impl Room {
    /// Creates a new empty room.
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            members: Mutex::new(RoomMembers::default()),
        }
    }

    /// Acquires the room's serialization point.
    pub async fn lock(&self) -> MutexGuard<'_, RoomMembers> {
        self.members.lock().await
    }
}
