//! End-to-end tests driving the HTTP router and the WebSocket endpoint.

mod auth_test;
mod helpers;
mod ws_test;
