//! Concrete repositories over the SQLite pool.

pub mod message;
pub mod user;
