//! # chatvibe-api
//!
//! HTTP API layer for ChatVibe built on Axum.
//!
//! Provides the account endpoints, presence and health reads, the
//! WebSocket upgrade, DTOs, and error mapping.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
