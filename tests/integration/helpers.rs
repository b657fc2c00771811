//! Shared test helpers for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tower::ServiceExt;

use chatvibe_api::AppState;
use chatvibe_core::config::AppConfig;
use chatvibe_database::DatabasePool;

/// Client side of a test WebSocket.
pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Shared state, for seeding users and inspecting the hub
    pub state: AppState,
}

impl TestApp {
    /// Create a new test application over a private in-memory database
    pub async fn new() -> Self {
        let mut config = AppConfig::default();
        config.database.url = "sqlite::memory:".to_string();

        let db = DatabasePool::in_memory()
            .await
            .expect("Failed to open test database");
        chatvibe_database::migration::run_migrations(db.pool())
            .await
            .expect("Failed to run migrations");

        let state = AppState::build(config, db);
        let router = chatvibe_api::build_router(state.clone());

        Self { router, state }
    }

    /// Register a user directly through the session bridge
    pub async fn create_user(&self, username: &str, password: &str) {
        self.state
            .bridge
            .register(username, password)
            .await
            .expect("Failed to create test user");
    }

    /// Make an HTTP request to the test app
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Serve the router on an ephemeral local port
    pub async fn spawn_server(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");
        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Test server failed");
        });
        addr
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

/// Open a WebSocket to a spawned server
pub async fn connect_ws(addr: SocketAddr) -> WsClient {
    let (ws, _) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("WebSocket handshake failed");
    ws
}

/// Send one JSON event
pub async fn send_event(ws: &mut WsClient, event: Value) {
    ws.send(Message::text(event.to_string()))
        .await
        .expect("Failed to send frame");
}

/// Send a raw text frame
pub async fn send_raw(ws: &mut WsClient, raw: &str) {
    ws.send(Message::text(raw.to_string()))
        .await
        .expect("Failed to send frame");
}

/// Next JSON event, skipping control frames
pub async fn next_event(ws: &mut WsClient) -> Value {
    loop {
        let msg = tokio::time::timeout(EVENT_TIMEOUT, ws.next())
            .await
            .expect("Timed out waiting for event")
            .expect("Socket closed")
            .expect("Socket error");
        if msg.is_text() {
            let text = msg.to_text().expect("Non-UTF-8 frame");
            return serde_json::from_str(text).expect("Event is not JSON");
        }
    }
}

/// Skip events until one of type `kind` arrives
pub async fn expect_event(ws: &mut WsClient, kind: &str) -> Value {
    loop {
        let event = next_event(ws).await;
        if event["type"] == kind {
            return event;
        }
    }
}

/// Connect, authenticate, and wait for the resulting presence update
pub async fn login_ws(addr: SocketAddr, username: &str, password: &str) -> WsClient {
    let mut ws = connect_ws(addr).await;
    send_event(
        &mut ws,
        serde_json::json!({"type": "authenticate", "username": username, "password": password}),
    )
    .await;
    let presence = expect_event(&mut ws, "presence_changed").await;
    assert!(
        presence["online"]
            .as_array()
            .is_some_and(|online| online.iter().any(|o| o == username)),
        "unexpected presence: {presence}"
    );
    ws
}
