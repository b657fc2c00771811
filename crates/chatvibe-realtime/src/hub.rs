//! Realtime hub: owns connections, rooms, and presence.
//!
//! Every state change of a connection goes through the hub. Locking rules:
//!
//! - A room's member lock is held across join (history load + membership),
//!   send (append + fan-out) and typing, so every member sees the room's
//!   events in append order.
//! - The presence gate is held across each presence mutation and its
//!   broadcast, so online-set snapshots arrive in mutation order.
//! - Lock order is room lock, then connection state lock. Nothing holds a
//!   connection state lock while acquiring a room lock or the gate.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use chatvibe_core::config::RealtimeConfig;
use chatvibe_core::error::AppError;
use chatvibe_core::result::AppResult;
use chatvibe_core::traits::MessageStore;
use chatvibe_core::types::{Identity, Message, RoomId};

use crate::connection::handle::{ConnectionHandle, ConnectionId, ConnectionState, Session};
use crate::connection::pool::ConnectionPool;
use crate::message::types::OutboundEvent;
use crate::metrics::{MetricsSnapshot, RealtimeMetrics};
use crate::presence::registry::PresenceRegistry;
use crate::room::registry::RoomRegistry;
use crate::room::room::{Room, RoomMembers};

/// Central coordinator of realtime state.
pub struct RealtimeHub {
    pool: ConnectionPool,
    rooms: RoomRegistry,
    presence: PresenceRegistry,
    store: Arc<dyn MessageStore>,
    metrics: RealtimeMetrics,
    presence_gate: Mutex<()>,
    config: RealtimeConfig,
}

impl std::fmt::Debug for RealtimeHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeHub")
            .field("connections", &self.pool.connection_count())
            .field("rooms", &self.rooms.room_count())
            .field("online", &self.presence.online_count())
            .finish()
    }
}

impl RealtimeHub {
    /// Creates a hub backed by `store`.
    pub fn new(store: Arc<dyn MessageStore>, config: RealtimeConfig) -> Self {
        Self {
            pool: ConnectionPool::new(),
            rooms: RoomRegistry::new(),
            presence: PresenceRegistry::new(),
            store,
            metrics: RealtimeMetrics::new(),
            presence_gate: Mutex::new(()),
            config,
        }
    }

    /// Registers a new unauthenticated connection.
    ///
    /// Returns the handle and the receiver the transport drains.
    pub fn connect(&self) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundEvent>) {
        let (tx, rx) = mpsc::channel(self.config.outbound_buffer_size.max(1));
        let handle = Arc::new(ConnectionHandle::new(tx));
        self.pool.add(handle.clone());
        self.metrics.record_connect();

        info!(conn_id = %handle.id, "Connection opened");
        (handle, rx)
    }

    /// Binds `identity` to an unauthenticated connection and broadcasts the
    /// new online set to every connection.
    pub async fn authenticate(&self, conn: &ConnectionHandle, identity: Identity) -> AppResult<()> {
        let _gate = self.presence_gate.lock().await;

        {
            let mut state = conn.state.write().await;
            match &*state {
                ConnectionState::Unauthenticated => {
                    *state = ConnectionState::Authenticated(Session {
                        identity: identity.clone(),
                        rooms: HashSet::new(),
                    });
                }
                ConnectionState::Authenticated(_) => {
                    return Err(AppError::invalid_state("Connection is already authenticated"));
                }
                ConnectionState::Disconnected => {
                    return Err(AppError::invalid_state("Connection is closed"));
                }
            }
        }

        let online = self.presence.mark_online(&identity);
        info!(conn_id = %conn.id, identity = %identity, online = online.len(), "Connection authenticated");
        self.broadcast_all(OutboundEvent::PresenceChanged { online });
        Ok(())
    }

    /// Adds the connection to `room` and replays its recent history to this
    /// connection only.
    ///
    /// Returns `false` when the connection already was a member; no second
    /// history is sent in that case.
    pub async fn join_room(&self, conn: &ConnectionHandle, room: &RoomId) -> AppResult<bool> {
        loop {
            let entry = self.rooms.get_or_create(room);
            let mut members = entry.lock().await;
            if members.is_retired() {
                continue;
            }

            let result = self.join_locked(conn, room, &mut members).await;
            self.release_if_empty(&entry, &mut members);
            return result;
        }
    }

    async fn join_locked(
        &self,
        conn: &ConnectionHandle,
        room: &RoomId,
        members: &mut RoomMembers,
    ) -> AppResult<bool> {
        let identity = match &*conn.state.read().await {
            ConnectionState::Unauthenticated => {
                return Err(AppError::authorization("Authenticate before joining a room"));
            }
            ConnectionState::Disconnected => {
                return Err(AppError::invalid_state("Connection is closed"));
            }
            ConnectionState::Authenticated(session) => {
                if session.rooms.contains(room) {
                    return Ok(false);
                }
                session.identity.clone()
            }
        };

        let history = self
            .store
            .recent_messages(room, self.config.history_window)
            .await?;

        // Disconnect may have run while history was loading.
        match &mut *conn.state.write().await {
            ConnectionState::Authenticated(session) => {
                if !session.rooms.insert(room.clone()) {
                    return Ok(false);
                }
            }
            ConnectionState::Disconnected => {
                return Err(AppError::invalid_state("Connection is closed"));
            }
            ConnectionState::Unauthenticated => {
                return Err(AppError::authorization("Authenticate before joining a room"));
            }
        }
        members.insert(conn.id);

        debug!(
            conn_id = %conn.id,
            identity = %identity,
            room = %room,
            replayed = history.len(),
            "Joined room"
        );
        self.deliver(
            conn,
            OutboundEvent::HistoryLoaded {
                room: room.clone(),
                messages: history,
            },
        );
        Ok(true)
    }

    /// Removes the connection from `room`.
    ///
    /// Returns `false` when it was not a member.
    pub async fn leave_room(&self, conn: &ConnectionHandle, room: &RoomId) -> AppResult<bool> {
        let identity = self.require_identity(conn).await?;

        let Some(entry) = self.rooms.get(room) else {
            return Ok(false);
        };
        let mut members = entry.lock().await;
        if members.is_retired() {
            return Ok(false);
        }

        if let ConnectionState::Authenticated(session) = &mut *conn.state.write().await {
            session.rooms.remove(room);
        }
        let removed = members.remove(&conn.id);
        self.release_if_empty(&entry, &mut members);

        if removed {
            debug!(conn_id = %conn.id, identity = %identity, room = %room, "Left room");
        }
        Ok(removed)
    }

    /// Persists a message and delivers it to every member of `room`,
    /// the sender included.
    ///
    /// The global room takes no recipient; a conversation requires the
    /// sender's counterpart. Nothing is delivered when the append fails.
    pub async fn send_message(
        &self,
        conn: &ConnectionHandle,
        room: &RoomId,
        text: &str,
        recipient: Option<&Identity>,
    ) -> AppResult<Message> {
        let sender = self.require_identity(conn).await?;
        check_recipient(room, &sender, recipient)?;

        let Some(entry) = self.rooms.get(room) else {
            return Err(not_member(room));
        };
        let members = entry.lock().await;
        if !members.contains(&conn.id) {
            return Err(not_member(room));
        }

        let message = match self.store.append(room, &sender, recipient, text).await {
            Ok(message) => message,
            Err(e) => {
                warn!(conn_id = %conn.id, identity = %sender, room = %room, error = %e, "Message rejected");
                return Err(e);
            }
        };
        self.metrics.record_append();

        debug!(
            conn_id = %conn.id,
            identity = %sender,
            room = %room,
            id = message.id,
            members = members.len(),
            "Fanning out message"
        );
        self.fan_out(
            &members,
            None,
            OutboundEvent::MessageReceived {
                room: room.clone(),
                message: message.clone(),
            },
        );
        Ok(message)
    }

    /// Tells the other members of `room` that this connection is typing.
    pub async fn typing(&self, conn: &ConnectionHandle, room: &RoomId) -> AppResult<()> {
        let from = self.require_identity(conn).await?;

        let Some(entry) = self.rooms.get(room) else {
            return Err(not_member(room));
        };
        let members = entry.lock().await;
        if !members.contains(&conn.id) {
            return Err(not_member(room));
        }

        self.fan_out(
            &members,
            Some(conn.id),
            OutboundEvent::TypingIndicator {
                room: room.clone(),
                from,
            },
        );
        Ok(())
    }

    /// Closes a connection from any state.
    ///
    /// An authenticated connection goes offline and the new online set is
    /// broadcast. Returns `false` if the connection was already closed.
    pub async fn disconnect(&self, conn: &ConnectionHandle) -> bool {
        if self.pool.remove(&conn.id).is_none() {
            return false;
        }
        conn.mark_dead();

        let previous = {
            let _gate = self.presence_gate.lock().await;
            let previous =
                std::mem::replace(&mut *conn.state.write().await, ConnectionState::Disconnected);
            if let ConnectionState::Authenticated(session) = &previous {
                let online = self.presence.mark_offline(&session.identity);
                info!(conn_id = %conn.id, identity = %session.identity, online = online.len(), "Authenticated connection closed");
                self.broadcast_all(OutboundEvent::PresenceChanged { online });
            }
            previous
        };

        if let ConnectionState::Authenticated(session) = previous {
            for room in &session.rooms {
                self.remove_member(room, &conn.id).await;
            }
        }

        self.metrics.record_disconnect();
        let duration_ms = (chrono::Utc::now() - conn.connected_at).num_milliseconds();
        info!(conn_id = %conn.id, duration_ms, "Connection closed");
        true
    }

    /// Disconnects every live connection.
    pub async fn close_all(&self) {
        let connections = self.pool.all_connections();
        info!(count = connections.len(), "Closing all connections");
        for conn in connections {
            self.disconnect(&conn).await;
        }
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Number of rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.rooms.room_count()
    }

    /// Presence registry.
    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    /// Counter snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn require_identity(&self, conn: &ConnectionHandle) -> AppResult<Identity> {
        match &*conn.state.read().await {
            ConnectionState::Authenticated(session) => Ok(session.identity.clone()),
            ConnectionState::Unauthenticated => {
                Err(AppError::authorization("Connection is not authenticated"))
            }
            ConnectionState::Disconnected => Err(AppError::invalid_state("Connection is closed")),
        }
    }

    async fn remove_member(&self, room: &RoomId, conn_id: &ConnectionId) {
        let Some(entry) = self.rooms.get(room) else {
            return;
        };
        let mut members = entry.lock().await;
        members.remove(conn_id);
        self.release_if_empty(&entry, &mut members);
    }

    /// Drops an emptied room from the registry. Must be called with the
    /// room's lock held.
    fn release_if_empty(&self, entry: &Arc<Room>, members: &mut RoomMembers) {
        if members.is_empty() && !members.is_retired() {
            members.retire();
            self.rooms.remove_if_same(entry);
            debug!(room = %entry.id, "Room emptied");
        }
    }

    fn deliver(&self, conn: &ConnectionHandle, event: OutboundEvent) -> bool {
        let delivered = conn.send(event);
        self.metrics.record_delivery(delivered);
        delivered
    }

    fn fan_out(&self, members: &RoomMembers, except: Option<ConnectionId>, event: OutboundEvent) {
        for conn_id in members.iter() {
            if Some(*conn_id) == except {
                continue;
            }
            if let Some(conn) = self.pool.get(conn_id) {
                self.deliver(&conn, event.clone());
            }
        }
    }

    fn broadcast_all(&self, event: OutboundEvent) {
        for conn in self.pool.all_connections() {
            self.deliver(&conn, event.clone());
        }
    }
}

/// Checks that `recipient` is the party implied by `room`.
fn check_recipient(room: &RoomId, sender: &Identity, recipient: Option<&Identity>) -> AppResult<()> {
    match (room, recipient) {
        (RoomId::Global, None) => Ok(()),
        (RoomId::Global, Some(_)) => Err(AppError::authorization(
            "Messages to the global room have no recipient",
        )),
        (RoomId::Conversation(key), Some(recipient))
            if key.counterpart_of(sender) == Some(recipient) =>
        {
            Ok(())
        }
        (RoomId::Conversation(key), _) => Err(AppError::authorization(format!(
            "'{sender}' may not post to conversation '{key}'"
        ))),
    }
}

fn not_member(room: &RoomId) -> AppError {
    AppError::authorization(format!("Not a member of room '{room}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chatvibe_core::error::ErrorKind;
    use chatvibe_core::types::derive_key;
    use chatvibe_database::migration::run_migrations;
    use chatvibe_database::{DatabasePool, SqliteMessageStore};

    struct TestHub {
        hub: RealtimeHub,
        store: SqliteMessageStore,
    }

    async fn make_hub() -> TestHub {
        let db = DatabasePool::in_memory().await.unwrap();
        run_migrations(db.pool()).await.unwrap();
        let store = SqliteMessageStore::new(db.pool().clone());
        let hub = RealtimeHub::new(Arc::new(store.clone()), RealtimeConfig::default());
        TestHub { hub, store }
    }

    fn id(s: &str) -> Identity {
        Identity::new(s).unwrap()
    }

    fn drain(rx: &mut mpsc::Receiver<OutboundEvent>) -> Vec<OutboundEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn presence_updates(events: &[OutboundEvent]) -> Vec<Vec<Identity>> {
        events
            .iter()
            .filter_map(|e| match e {
                OutboundEvent::PresenceChanged { online } => Some(online.clone()),
                _ => None,
            })
            .collect()
    }

    fn received_texts(events: &[OutboundEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                OutboundEvent::MessageReceived { message, .. } => Some(message.text.clone()),
                _ => None,
            })
            .collect()
    }

    async fn online(
        hub: &RealtimeHub,
        name: &str,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundEvent>) {
        let (conn, rx) = hub.connect();
        hub.authenticate(&conn, id(name)).await.unwrap();
        (conn, rx)
    }

    struct FailingStore;

    #[async_trait]
    impl MessageStore for FailingStore {
        async fn append(
            &self,
            _room: &RoomId,
            _sender: &Identity,
            _recipient: Option<&Identity>,
            _text: &str,
        ) -> AppResult<Message> {
            Err(AppError::storage("disk full"))
        }

        async fn recent_messages(&self, _room: &RoomId, _limit: i64) -> AppResult<Vec<Message>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_presence_follows_connections() {
        let t = make_hub().await;
        let (alice, mut alice_rx) = online(&t.hub, "alice").await;
        let (_bob, mut bob_rx) = online(&t.hub, "bob").await;

        assert_eq!(
            presence_updates(&drain(&mut alice_rx)),
            vec![vec![id("alice")], vec![id("alice"), id("bob")]]
        );
        assert_eq!(
            presence_updates(&drain(&mut bob_rx)),
            vec![vec![id("alice"), id("bob")]]
        );

        assert!(t.hub.disconnect(&alice).await);
        assert_eq!(presence_updates(&drain(&mut bob_rx)), vec![vec![id("bob")]]);
        assert!(!t.hub.presence().is_online(&id("alice")));
        assert!(t.hub.presence().is_online(&id("bob")));
    }

    #[tokio::test]
    async fn test_double_disconnect_broadcasts_once() {
        let t = make_hub().await;
        let (alice, _alice_rx) = online(&t.hub, "alice").await;
        let (_bob, mut bob_rx) = online(&t.hub, "bob").await;
        drain(&mut bob_rx);

        assert!(t.hub.disconnect(&alice).await);
        assert!(!t.hub.disconnect(&alice).await);

        assert_eq!(presence_updates(&drain(&mut bob_rx)).len(), 1);
        assert_eq!(t.hub.presence().connection_count(&id("alice")), 0);
        assert_eq!(t.hub.metrics().connections_closed, 1);
    }

    #[tokio::test]
    async fn test_identity_stays_online_while_one_connection_remains() {
        let t = make_hub().await;
        let (first, _rx1) = online(&t.hub, "alice").await;
        let (_second, _rx2) = online(&t.hub, "alice").await;

        t.hub.disconnect(&first).await;
        assert!(t.hub.presence().is_online(&id("alice")));
    }

    #[tokio::test]
    async fn test_conversation_history_replayed_to_later_joiner() {
        let t = make_hub().await;
        let room = derive_key("alice", "bob").unwrap();

        let (alice, mut alice_rx) = online(&t.hub, "alice").await;
        assert!(t.hub.join_room(&alice, &room).await.unwrap());
        let sent = t
            .hub
            .send_message(&alice, &room, "hi", Some(&id("bob")))
            .await
            .unwrap();
        assert_eq!(sent.sender, id("alice"));
        assert_eq!(sent.recipient, Some(id("bob")));
        assert_eq!(received_texts(&drain(&mut alice_rx)), vec!["hi"]);
        assert_eq!(t.store.count(&room).await.unwrap(), 1);

        let (bob, mut bob_rx) = online(&t.hub, "bob").await;
        drain(&mut bob_rx);
        t.hub.join_room(&bob, &room).await.unwrap();

        let events = drain(&mut bob_rx);
        match events.as_slice() {
            [OutboundEvent::HistoryLoaded { room: r, messages }] => {
                assert_eq!(r, &room);
                assert_eq!(messages, &vec![sent]);
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejoin_is_noop() {
        let t = make_hub().await;
        let (alice, mut rx) = online(&t.hub, "alice").await;
        drain(&mut rx);

        assert!(t.hub.join_room(&alice, &RoomId::Global).await.unwrap());
        assert!(!t.hub.join_room(&alice, &RoomId::Global).await.unwrap());

        let histories = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, OutboundEvent::HistoryLoaded { .. }))
            .count();
        assert_eq!(histories, 1);
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected_and_not_broadcast() {
        let t = make_hub().await;
        let (alice, mut alice_rx) = online(&t.hub, "alice").await;
        let (bob, mut bob_rx) = online(&t.hub, "bob").await;
        t.hub.join_room(&alice, &RoomId::Global).await.unwrap();
        t.hub.join_room(&bob, &RoomId::Global).await.unwrap();
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        let err = t
            .hub
            .send_message(&alice, &RoomId::Global, "   \n\t", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        assert!(drain(&mut alice_rx).is_empty());
        assert!(drain(&mut bob_rx).is_empty());
        assert_eq!(t.store.count(&RoomId::Global).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unauthenticated_cannot_join_or_send() {
        let t = make_hub().await;
        let (conn, _rx) = t.hub.connect();

        let err = t.hub.join_room(&conn, &RoomId::Global).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);

        let err = t
            .hub
            .send_message(&conn, &RoomId::Global, "hello", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);

        assert_eq!(t.store.count(&RoomId::Global).await.unwrap(), 0);
        assert_eq!(t.hub.room_count(), 0);
    }

    #[tokio::test]
    async fn test_global_members_see_same_order_including_sender() {
        let t = make_hub().await;
        let (alice, mut alice_rx) = online(&t.hub, "alice").await;
        let (bob, mut bob_rx) = online(&t.hub, "bob").await;
        t.hub.join_room(&alice, &RoomId::Global).await.unwrap();
        t.hub.join_room(&bob, &RoomId::Global).await.unwrap();

        t.hub
            .send_message(&alice, &RoomId::Global, "one", None)
            .await
            .unwrap();
        t.hub
            .send_message(&bob, &RoomId::Global, "two", None)
            .await
            .unwrap();

        assert_eq!(received_texts(&drain(&mut alice_rx)), vec!["one", "two"]);
        assert_eq!(received_texts(&drain(&mut bob_rx)), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_concurrent_senders_deliver_in_store_order() {
        let t = make_hub().await;
        let hub = Arc::new(t.hub);
        let (watcher, mut watcher_rx) = online(&hub, "watcher").await;
        hub.join_room(&watcher, &RoomId::Global).await.unwrap();

        let mut tasks = Vec::new();
        for name in ["alice", "bob", "carol"] {
            let hub = hub.clone();
            tasks.push(tokio::spawn(async move {
                let (conn, _rx) = hub.connect();
                hub.authenticate(&conn, id(name)).await.unwrap();
                hub.join_room(&conn, &RoomId::Global).await.unwrap();
                for i in 0..5 {
                    hub.send_message(&conn, &RoomId::Global, &format!("{name}-{i}"), None)
                        .await
                        .unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let ids: Vec<i64> = drain(&mut watcher_rx)
            .into_iter()
            .filter_map(|e| match e {
                OutboundEvent::MessageReceived { message, .. } => Some(message.id),
                _ => None,
            })
            .collect();
        assert_eq!(ids.len(), 15);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_typing_skips_sender() {
        let t = make_hub().await;
        let (alice, mut alice_rx) = online(&t.hub, "alice").await;
        let (bob, mut bob_rx) = online(&t.hub, "bob").await;
        t.hub.join_room(&alice, &RoomId::Global).await.unwrap();
        t.hub.join_room(&bob, &RoomId::Global).await.unwrap();
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        t.hub.typing(&alice, &RoomId::Global).await.unwrap();

        assert!(drain(&mut alice_rx).is_empty());
        assert_eq!(
            drain(&mut bob_rx),
            vec![OutboundEvent::TypingIndicator {
                room: RoomId::Global,
                from: id("alice"),
            }]
        );
    }

    #[tokio::test]
    async fn test_typing_requires_membership() {
        let t = make_hub().await;
        let (alice, _rx) = online(&t.hub, "alice").await;
        let err = t.hub.typing(&alice, &RoomId::Global).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn test_store_failure_is_not_broadcast() {
        let hub = RealtimeHub::new(Arc::new(FailingStore), RealtimeConfig::default());
        let (alice, mut alice_rx) = online(&hub, "alice").await;
        let (bob, mut bob_rx) = online(&hub, "bob").await;
        hub.join_room(&alice, &RoomId::Global).await.unwrap();
        hub.join_room(&bob, &RoomId::Global).await.unwrap();
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        let err = hub
            .send_message(&alice, &RoomId::Global, "lost", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Storage);
        assert!(drain(&mut alice_rx).is_empty());
        assert!(drain(&mut bob_rx).is_empty());
        assert_eq!(hub.metrics().messages_appended, 0);
    }

    #[tokio::test]
    async fn test_reauthentication_is_rejected() {
        let t = make_hub().await;
        let (alice, _rx) = online(&t.hub, "alice").await;

        let err = t.hub.authenticate(&alice, id("mallory")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);
        assert_eq!(alice.identity().await, Some(id("alice")));
        assert!(!t.hub.presence().is_online(&id("mallory")));
    }

    #[tokio::test]
    async fn test_non_participant_may_join_but_not_post() {
        let t = make_hub().await;
        let room = derive_key("alice", "bob").unwrap();
        let (mallory, _rx) = online(&t.hub, "mallory").await;

        t.hub.join_room(&mallory, &room).await.unwrap();
        for recipient in [id("alice"), id("bob")] {
            let err = t
                .hub
                .send_message(&mallory, &room, "psst", Some(&recipient))
                .await
                .unwrap_err();
            assert_eq!(err.kind, ErrorKind::Authorization);
        }
        assert_eq!(t.store.count(&room).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_recipient_must_match_room() {
        let t = make_hub().await;
        let room = derive_key("alice", "bob").unwrap();
        let (alice, _rx) = online(&t.hub, "alice").await;
        t.hub.join_room(&alice, &room).await.unwrap();
        t.hub.join_room(&alice, &RoomId::Global).await.unwrap();

        let wrong = t.hub.send_message(&alice, &room, "hi", Some(&id("carol"))).await;
        assert_eq!(wrong.unwrap_err().kind, ErrorKind::Authorization);

        let missing = t.hub.send_message(&alice, &room, "hi", None).await;
        assert_eq!(missing.unwrap_err().kind, ErrorKind::Authorization);

        let global = t
            .hub
            .send_message(&alice, &RoomId::Global, "hi", Some(&id("bob")))
            .await;
        assert_eq!(global.unwrap_err().kind, ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn test_leave_then_send_is_rejected() {
        let t = make_hub().await;
        let (alice, _rx) = online(&t.hub, "alice").await;
        t.hub.join_room(&alice, &RoomId::Global).await.unwrap();
        assert_eq!(t.hub.room_count(), 1);

        assert!(t.hub.leave_room(&alice, &RoomId::Global).await.unwrap());
        assert!(!t.hub.leave_room(&alice, &RoomId::Global).await.unwrap());
        assert_eq!(t.hub.room_count(), 0);
        assert!(alice.rooms().await.is_empty());

        let err = t
            .hub
            .send_message(&alice, &RoomId::Global, "hello?", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn test_disconnect_clears_memberships() {
        let t = make_hub().await;
        let (alice, _alice_rx) = online(&t.hub, "alice").await;
        let (bob, mut bob_rx) = online(&t.hub, "bob").await;
        t.hub.join_room(&alice, &RoomId::Global).await.unwrap();
        t.hub.join_room(&bob, &RoomId::Global).await.unwrap();

        t.hub.disconnect(&alice).await;
        drain(&mut bob_rx);

        t.hub
            .send_message(&bob, &RoomId::Global, "anyone?", None)
            .await
            .unwrap();
        assert_eq!(received_texts(&drain(&mut bob_rx)), vec!["anyone?"]);
        assert_eq!(t.hub.metrics().events_dropped, 0);

        let err = t.hub.join_room(&alice, &RoomId::Global).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);

        t.hub.disconnect(&bob).await;
        assert_eq!(t.hub.room_count(), 0);
        assert_eq!(t.hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_authenticate_after_disconnect_is_rejected() {
        let t = make_hub().await;
        let (conn, _rx) = t.hub.connect();
        t.hub.disconnect(&conn).await;

        let err = t.hub.authenticate(&conn, id("alice")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);
        assert!(!t.hub.presence().is_online(&id("alice")));
    }
}
