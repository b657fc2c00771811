//! Turns client credentials into a trusted identity.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::Identity;

/// Verifies credentials presented on a realtime connection.
///
/// The realtime hub trusts the returned identity completely.
#[async_trait]
pub trait SessionBridge: Send + Sync + 'static {
    /// Verify a username/password pair.
    async fn verify(&self, username: &str, password: &str) -> AppResult<Identity>;
}
