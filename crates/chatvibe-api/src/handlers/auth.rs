//! Auth handlers: signup, login.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::info;
use validator::Validate;

use chatvibe_core::traits::SessionBridge;

use crate::dto::request::{LoginRequest, SignupRequest};
use crate::dto::response::{ApiResponse, IdentityResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<IdentityResponse>>), ApiError> {
    req.validate()?;

    let identity = state.bridge.register(&req.username, &req.password).await?;
    info!(identity = %identity, "Signup completed");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(IdentityResponse { identity })),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<IdentityResponse>>, ApiError> {
    req.validate()?;

    let identity = state.bridge.verify(&req.username, &req.password).await?;

    Ok(Json(ApiResponse::ok(IdentityResponse { identity })))
}
