//! Credential policy for new accounts.

use chatvibe_core::error::AppError;

/// Longest accepted username.
pub const MAX_USERNAME_LEN: usize = 32;
/// Shortest accepted password.
pub const MIN_PASSWORD_LEN: usize = 8;
/// Longest accepted password.
pub const MAX_PASSWORD_LEN: usize = 128;

/// Validates usernames and passwords at signup.
#[derive(Debug, Clone)]
pub struct CredentialValidator {
    min_password_length: usize,
    max_password_length: usize,
}

impl Default for CredentialValidator {
    fn default() -> Self {
        Self {
            min_password_length: MIN_PASSWORD_LEN,
            max_password_length: MAX_PASSWORD_LEN,
        }
    }
}

impl CredentialValidator {
    /// Creates a validator with the default length bounds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a username.
    ///
    /// Either a handle of `[A-Za-z0-9_.-]` or a phone number (`+` followed
    /// by digits), at most 32 characters long.
    pub fn validate_username(&self, username: &str) -> Result<(), AppError> {
        if username.is_empty() {
            return Err(AppError::validation("Username must not be empty"));
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(AppError::validation(format!(
                "Username must be at most {MAX_USERNAME_LEN} characters long"
            )));
        }

        if let Some(digits) = username.strip_prefix('+') {
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                return Err(AppError::validation(
                    "Phone numbers must be '+' followed by digits",
                ));
            }
            return Ok(());
        }

        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        {
            return Err(AppError::validation(
                "Username may only contain letters, digits, '_', '.' and '-'",
            ));
        }

        Ok(())
    }

    /// Validates a password against the length bounds.
    pub fn validate_password(&self, password: &str) -> Result<(), AppError> {
        let len = password.chars().count();
        if len < self.min_password_length {
            return Err(AppError::validation(format!(
                "Password must be at least {} characters long",
                self.min_password_length
            )));
        }
        if len > self.max_password_length {
            return Err(AppError::validation(format!(
                "Password must be at most {} characters long",
                self.max_password_length
            )));
        }
        Ok(())
    }
}
