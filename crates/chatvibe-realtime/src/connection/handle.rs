//! Individual WebSocket connection handle.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use chatvibe_core::types::{Identity, RoomId};

use crate::message::types::OutboundEvent;

/// Unique connection identifier
pub type ConnectionId = Uuid;

/// Identity and room memberships of an authenticated connection.
#[derive(Debug, Clone)]
pub struct Session {
    /// Identity bound at authentication; never rebound.
    pub identity: Identity,
    /// Rooms this connection has joined.
    pub rooms: HashSet<RoomId>,
}

/// Lifecycle state of a connection.
///
/// Transitions only move forward: `Unauthenticated → Authenticated →
/// Disconnected`, or straight to `Disconnected`.
#[derive(Debug, Clone)]
pub enum ConnectionState {
    /// Connected, no identity yet.
    Unauthenticated,
    /// Identity bound; may join rooms and post.
    Authenticated(Session),
    /// Closed. Terminal.
    Disconnected,
}

impl ConnectionState {
    /// The bound identity, if authenticated.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(session) => Some(&session.identity),
            _ => None,
        }
    }
}

/// A handle to a single WebSocket connection.
///
/// Holds the sender channel for pushing events to the client plus the
/// connection's state. Owned by the hub; the transport only keeps an
/// `Arc` to route inbound frames.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Sender for outbound events
    sender: mpsc::Sender<OutboundEvent>,
    /// Current lifecycle state
    pub(crate) state: RwLock<ConnectionState>,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Whether the outbound queue is still open
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a new, unauthenticated connection handle
    pub fn new(sender: mpsc::Sender<OutboundEvent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            state: RwLock::new(ConnectionState::Unauthenticated),
            connected_at: Utc::now(),
            alive: AtomicBool::new(true),
        }
    }

    /// Queue an event for this connection without waiting.
    ///
    /// Returns `false` when the event was dropped because the queue is
    /// full or closed.
    pub fn send(&self, event: OutboundEvent) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Send buffer full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check if the outbound queue is still open
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// The bound identity, if authenticated
    pub async fn identity(&self) -> Option<Identity> {
        self.state.read().await.identity().cloned()
    }

    /// Whether an identity has been bound
    pub async fn is_authenticated(&self) -> bool {
        matches!(*self.state.read().await, ConnectionState::Authenticated(_))
    }

    /// Rooms currently joined
    pub async fn rooms(&self) -> Vec<RoomId> {
        match &*self.state.read().await {
            ConnectionState::Authenticated(session) => session.rooms.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }
}
