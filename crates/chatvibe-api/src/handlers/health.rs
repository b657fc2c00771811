//! Health check handlers.

use axum::Json;
use axum::extract::State;

use crate::dto::response::{ApiResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let hub = &state.realtime.hub;
    let (status, database) = match state.db.health_check().await {
        Ok(true) => ("ok", "connected"),
        _ => ("degraded", "unavailable"),
    };

    Json(ApiResponse::ok(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
        ws_connections: hub.connection_count(),
        online_users: hub.presence().online_count(),
        active_rooms: hub.room_count(),
        metrics: hub.metrics(),
    }))
}
