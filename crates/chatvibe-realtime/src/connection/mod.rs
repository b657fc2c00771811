//! Connection lifecycle: handles, the live pool, and credential checks.

pub mod authenticator;
pub mod handle;
pub mod pool;
