//! Credential-backed session bridge.

use async_trait::async_trait;
use tracing::{info, warn};

use chatvibe_core::error::AppError;
use chatvibe_core::result::AppResult;
use chatvibe_core::traits::session_bridge::SessionBridge;
use chatvibe_core::types::Identity;
use chatvibe_database::UserRepository;

use crate::password::{CredentialValidator, PasswordHasher};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Turns username/password pairs into trusted identities.
///
/// Argon2 work runs on the blocking pool so it never stalls the runtime.
#[derive(Debug, Clone)]
pub struct CredentialBridge {
    users: UserRepository,
    hasher: PasswordHasher,
    validator: CredentialValidator,
}

impl CredentialBridge {
    /// Creates a bridge over the given user repository.
    pub fn new(users: UserRepository) -> Self {
        Self {
            users,
            hasher: PasswordHasher::new(),
            validator: CredentialValidator::new(),
        }
    }

    /// Registers a new account and returns its identity.
    ///
    /// Fails with `Validation` for credentials outside policy and with
    /// `Conflict` when the username is taken.
    pub async fn register(&self, username: &str, password: &str) -> AppResult<Identity> {
        self.validator.validate_username(username)?;
        self.validator.validate_password(password)?;

        let hasher = self.hasher.clone();
        let password = password.to_owned();
        let hash = tokio::task::spawn_blocking(move || hasher.hash_password(&password))
            .await
            .map_err(|e| AppError::internal(format!("Password hashing task failed: {e}")))??;

        let user = self.users.create(username, &hash).await?;
        info!(username = %user.username, "User registered");
        Identity::new(user.username)
    }
}

#[async_trait]
impl SessionBridge for CredentialBridge {
    async fn verify(&self, username: &str, password: &str) -> AppResult<Identity> {
        let Some(user) = self.users.find_by_username(username).await? else {
            warn!(username = %username, "Login attempt for unknown user");
            return Err(AppError::authentication(INVALID_CREDENTIALS));
        };

        let hasher = self.hasher.clone();
        let password = password.to_owned();
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || hasher.verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::internal(format!("Password verification task failed: {e}")))??;

        if !matches {
            warn!(username = %username, "Login attempt with wrong password");
            return Err(AppError::authentication(INVALID_CREDENTIALS));
        }

        Identity::new(user.username)
    }
}
