//! Application state shared across all handlers.

use std::sync::Arc;

use chatvibe_auth::CredentialBridge;
use chatvibe_core::config::AppConfig;
use chatvibe_database::{DatabasePool, SqliteMessageStore, UserRepository};
use chatvibe_realtime::RealtimeEngine;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// SQLite connection pool
    pub db: DatabasePool,
    /// Signup and credential verification
    pub bridge: Arc<CredentialBridge>,
    /// Real-time engine
    pub realtime: Arc<RealtimeEngine>,
}

impl AppState {
    /// Wires repositories, the session bridge, and the realtime engine
    /// over an already migrated database.
    pub fn build(config: AppConfig, db: DatabasePool) -> Self {
        let store = SqliteMessageStore::new(db.pool().clone())
            .with_max_chars(config.realtime.max_message_chars);
        let bridge = Arc::new(CredentialBridge::new(UserRepository::new(db.pool().clone())));
        let realtime = Arc::new(RealtimeEngine::new(
            Arc::new(store),
            bridge.clone(),
            config.realtime.clone(),
        ));

        Self {
            config: Arc::new(config),
            db,
            bridge,
            realtime,
        }
    }
}
