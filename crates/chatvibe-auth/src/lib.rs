//! # chatvibe-auth
//!
//! The session bridge between ChatVibe accounts and the realtime hub.
//!
//! ## Modules
//!
//! - `password`: Argon2id password hashing and credential policy
//! - `bridge`: [`CredentialBridge`], the `SessionBridge` implementation
//!   that verifies username/password pairs against the users table

pub mod bridge;
pub mod password;

pub use bridge::CredentialBridge;
pub use password::{CredentialValidator, PasswordHasher};
