//! # chatvibe-core
//!
//! Core crate for ChatVibe. Contains configuration schemas, the domain
//! types shared by every layer (identities, rooms, messages), the seam
//! traits implemented by storage and authentication, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other ChatVibe crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
