//! Wire event types, frame validation, and JSON encoding.

pub mod serializer;
pub mod types;
pub mod validator;
