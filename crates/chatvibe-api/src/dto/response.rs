//! Response DTOs.

use serde::{Deserialize, Serialize};

use chatvibe_core::types::Identity;
use chatvibe_realtime::metrics::MetricsSnapshot;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Result of signup or login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityResponse {
    /// The verified identity.
    pub identity: Identity,
}

/// Current online set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceResponse {
    /// Online identities, sorted.
    pub online: Vec<Identity>,
}

/// Liveness and hub counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Database status.
    pub database: String,
    /// Live WebSocket connections.
    pub ws_connections: usize,
    /// Online identities.
    pub online_users: usize,
    /// Rooms with members.
    pub active_rooms: usize,
    /// Hub counters.
    pub metrics: MetricsSnapshot,
}
