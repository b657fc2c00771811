//! # chatvibe-database
//!
//! SQLite connection management, schema migrations, and the concrete
//! repositories behind ChatVibe's durable state: the message log and the
//! users table consulted by the session bridge.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use repositories::message::SqliteMessageStore;
pub use repositories::user::UserRepository;
