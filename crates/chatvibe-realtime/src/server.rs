//! Top-level real-time engine: the wire boundary in front of the hub.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use chatvibe_core::config::RealtimeConfig;
use chatvibe_core::error::AppError;
use chatvibe_core::result::AppResult;
use chatvibe_core::traits::{MessageStore, SessionBridge};
use chatvibe_core::types::{Identity, RoomId, derive_key};

use crate::connection::authenticator::WsAuthenticator;
use crate::connection::handle::ConnectionHandle;
use crate::hub::RealtimeHub;
use crate::message::serializer::deserialize_inbound;
use crate::message::types::{InboundEvent, OutboundEvent, RoomTarget};
use crate::message::validator::validate_frame;

/// Parses inbound frames, dispatches them to the hub, and reports failures
/// to the originating connection.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// The hub owning all realtime state.
    pub hub: Arc<RealtimeHub>,
    authenticator: WsAuthenticator,
    config: RealtimeConfig,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine").finish()
    }
}

impl RealtimeEngine {
    /// Creates a new real-time engine.
    pub fn new(
        store: Arc<dyn MessageStore>,
        bridge: Arc<dyn SessionBridge>,
        config: RealtimeConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let hub = Arc::new(RealtimeHub::new(store, config.clone()));

        info!(
            history_window = config.history_window,
            outbound_buffer_size = config.outbound_buffer_size,
            "Real-time engine initialized"
        );

        Self {
            hub,
            authenticator: WsAuthenticator::new(bridge),
            config,
            shutdown_tx,
        }
    }

    /// Opens a new unauthenticated connection.
    pub fn connect(&self) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundEvent>) {
        self.hub.connect()
    }

    /// Handles one text frame from `conn`.
    ///
    /// Failures are sent back to `conn` as an `error` event and never close
    /// the connection.
    pub async fn handle_frame(&self, conn: &ConnectionHandle, raw: &str) {
        if let Err(err) = self.dispatch(conn, raw).await {
            debug!(conn_id = %conn.id, code = %err.code(), error = %err.message, "Request failed");
            if !conn.send(OutboundEvent::from(&err)) {
                warn!(conn_id = %conn.id, "Could not deliver error event");
            }
        }
    }

    /// Rejects a binary frame from `conn`. Events are JSON text only.
    pub fn handle_binary_frame(&self, conn: &ConnectionHandle) {
        let err = AppError::validation("Binary frames are not supported");
        debug!(conn_id = %conn.id, "Rejected binary frame");
        if !conn.send(OutboundEvent::from(&err)) {
            warn!(conn_id = %conn.id, "Could not deliver error event");
        }
    }

    async fn dispatch(&self, conn: &ConnectionHandle, raw: &str) -> AppResult<()> {
        validate_frame(raw, self.config.max_frame_bytes)?;

        match deserialize_inbound(raw)? {
            InboundEvent::Authenticate { username, password } => {
                // Skip the password hash when the answer is already known.
                if conn.is_authenticated().await {
                    return Err(AppError::invalid_state("Connection is already authenticated"));
                }
                let identity = self.authenticator.authenticate(&username, &password).await?;
                self.hub.authenticate(conn, identity).await
            }
            InboundEvent::JoinRoom { target } => {
                let (room, _) = self.resolve(conn, target).await?;
                self.hub.join_room(conn, &room).await.map(|_| ())
            }
            InboundEvent::LeaveRoom { target } => {
                let (room, _) = self.resolve(conn, target).await?;
                self.hub.leave_room(conn, &room).await.map(|_| ())
            }
            InboundEvent::SendMessage { target, text } => {
                let (room, recipient) = self.resolve(conn, target).await?;
                self.hub
                    .send_message(conn, &room, &text, recipient.as_ref())
                    .await
                    .map(|_| ())
            }
            InboundEvent::Typing { target } => {
                let (room, _) = self.resolve(conn, target).await?;
                self.hub.typing(conn, &room).await
            }
        }
    }

    /// Turns a client-side target into a room and, for conversations, the
    /// implied recipient.
    async fn resolve(
        &self,
        conn: &ConnectionHandle,
        target: RoomTarget,
    ) -> AppResult<(RoomId, Option<Identity>)> {
        let Some(identity) = conn.identity().await else {
            return Err(AppError::authorization("Connection is not authenticated"));
        };
        match target {
            RoomTarget::Global => Ok((RoomId::Global, None)),
            RoomTarget::Direct(counterpart) => {
                let room = derive_key(identity.as_str(), &counterpart)?;
                Ok((room, Some(Identity::new(counterpart)?)))
            }
        }
    }

    /// Closes a connection. Safe to call more than once.
    pub async fn disconnect(&self, conn: &ConnectionHandle) {
        self.hub.disconnect(conn).await;
    }

    /// Returns a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Initiates a graceful shutdown of the real-time engine.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        info!("Shutting down real-time engine");

        // Transports stop reading once signalled
        let _ = self.shutdown_tx.send(());

        self.hub.close_all().await;

        info!("Real-time engine shut down");
        Ok(())
    }
}
