//! WebSocket authentication: verifies credentials from the `authenticate` event.

use std::sync::Arc;

use tracing::debug;

use chatvibe_core::result::AppResult;
use chatvibe_core::traits::SessionBridge;
use chatvibe_core::types::Identity;

/// Authenticates WebSocket connections through the session bridge.
#[derive(Clone)]
pub struct WsAuthenticator {
    bridge: Arc<dyn SessionBridge>,
}

impl std::fmt::Debug for WsAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsAuthenticator").finish()
    }
}

impl WsAuthenticator {
    /// Creates a new WebSocket authenticator.
    pub fn new(bridge: Arc<dyn SessionBridge>) -> Self {
        Self { bridge }
    }

    /// Verifies a username/password pair and returns the trusted identity.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<Identity> {
        let identity = self.bridge.verify(username, password).await?;
        debug!(identity = %identity, "Credentials verified");
        Ok(identity)
    }
}
