//! Presence handlers.

use axum::Json;
use axum::extract::State;

use crate::dto::response::{ApiResponse, PresenceResponse};
use crate::state::AppState;

/// GET /api/presence
pub async fn online(State(state): State<AppState>) -> Json<ApiResponse<PresenceResponse>> {
    let online = state.realtime.hub.presence().online_snapshot();
    Json(ApiResponse::ok(PresenceResponse { online }))
}
