//! WebSocket upgrade handler.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{error, info, warn};

use chatvibe_realtime::message::serializer::serialize_outbound;

use crate::state::AppState;

/// GET /ws: WebSocket upgrade. The connection starts unauthenticated and
/// must send an `authenticate` event before joining rooms.
pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_ws_connection(state, socket))
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(state: AppState, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let engine = state.realtime.clone();

    let (handle, mut outbound_rx) = engine.connect();
    let conn_id = handle.id;
    let mut shutdown = engine.shutdown_receiver();

    info!(conn_id = %conn_id, "WebSocket connection established");

    // Spawn outbound event forwarder
    let outbound_task = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let json = match serialize_outbound(&event) {
                Ok(json) => json,
                Err(e) => {
                    error!(conn_id = %conn_id, error = %e, "Dropping unencodable event");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Process inbound frames
    loop {
        tokio::select! {
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    engine.handle_frame(&handle, text.as_str()).await;
                }
                Some(Ok(Message::Binary(_))) => engine.handle_binary_frame(&handle),
                Some(Ok(Message::Close(_))) | None => break,
                // Ping/pong is answered by axum
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            },
            _ = shutdown.recv() => break,
        }
    }

    // Cleanup
    engine.disconnect(&handle).await;
    outbound_task.abort();

    info!(conn_id = %conn_id, "WebSocket connection closed");
}
