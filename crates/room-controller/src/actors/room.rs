//! `RoomActor` - per-room actor that owns room state.
//!
//! Each `RoomActor`:
//! - Is the single point of serialization for one room
//! - Owns the session registry and drives broadcast fan-out
//! - Persists every atom before any session sees it
//! - Passivates (exits) after a configurable idle period
//!
//! # Passivation
//!
//! The actor is a cache over durable state: the atom log and metadata live
//! in the store, and session attachments live in the connection gateway.
//! When the mailbox has been quiet for the idle period the run loop simply
//! exits. Live sockets stay open at the gateway level; the supervisor
//! respawns the actor on the next operation, and startup rebuilds the
//! registry from the gateway's connection table.

use crate::actors::broadcast;
use crate::actors::messages::{ConnectedSession, RoomMessage};
use crate::actors::registry::{Session, SessionRegistry};
use crate::connections::{ConnectionDirectory, ConnectionId, OutboundFrame};
use crate::errors::RoomError;
use crate::model::{Atom, RoomMetadata};
use crate::storage::RoomStore;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Default channel buffer size for the room mailbox.
const ROOM_CHANNEL_BUFFER: usize = 256;

/// How often the run loop checks for idleness.
const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Per-room tunables, taken from service configuration.
#[derive(Debug, Clone)]
pub struct RoomSettings {
    /// Idle period after which the actor passivates.
    pub passivate_after: Duration,
    /// Maximum atom content size in bytes.
    pub max_content_bytes: usize,
}

/// Handle to a `RoomActor`.
#[derive(Clone)]
pub struct RoomActorHandle {
    sender: mpsc::Sender<RoomMessage>,
    cancel_token: CancellationToken,
    room_name: String,
}

impl RoomActorHandle {
    /// Get the room name.
    #[must_use]
    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    /// Attach a new connection, returning its connection and session ids.
    ///
    /// The actor registers the connection with the directory itself, in the
    /// same step that mints the session id, so the directory never holds a
    /// connection without a session attachment.
    pub async fn connect(
        &self,
        sender: mpsc::Sender<OutboundFrame>,
    ) -> Result<ConnectedSession, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::Connect {
                sender,
                respond_to: tx,
            })
            .await
            .map_err(|e| RoomError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RoomError::Internal(format!("response receive failed: {e}")))
    }

    /// Read the full atom history, oldest first.
    pub async fn list_atoms(&self) -> Result<Vec<Atom>, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::ListAtoms { respond_to: tx })
            .await
            .map_err(|e| RoomError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RoomError::Internal(format!("response receive failed: {e}")))?
    }

    /// Validate, persist, and broadcast a new atom.
    pub async fn append_atom(
        &self,
        content: Option<String>,
        author: Option<String>,
    ) -> Result<Atom, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::AppendAtom {
                content,
                author,
                respond_to: tx,
            })
            .await
            .map_err(|e| RoomError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RoomError::Internal(format!("response receive failed: {e}")))?
    }

    /// Fetch room metadata, creating it on first request.
    pub async fn get_metadata(&self) -> Result<RoomMetadata, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::GetMetadata { respond_to: tx })
            .await
            .map_err(|e| RoomError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RoomError::Internal(format!("response receive failed: {e}")))?
    }

    /// Notify the actor that a connection's socket closed.
    ///
    /// Best effort: a passivated actor has no registry entry to clean up,
    /// so a closed mailbox is not an error for the caller.
    pub async fn connection_closed(&self, connection_id: ConnectionId) {
        let _ = self
            .sender
            .send(RoomMessage::ConnectionClosed { connection_id })
            .await;
    }

    /// True once the actor's mailbox no longer accepts messages.
    ///
    /// A passivating actor closes its mailbox before it exits; callers that
    /// observe this should fetch a fresh handle from the supervisor.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Cancel the room actor.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the actor is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// The `RoomActor` implementation.
pub struct RoomActor {
    /// Room name (also the storage key prefix).
    room_name: String,
    /// Message receiver.
    receiver: mpsc::Receiver<RoomMessage>,
    /// Cancellation token (child of the supervisor's token).
    cancel_token: CancellationToken,
    /// Attached sessions (derived cache, rebuilt on activation).
    registry: SessionRegistry,
    /// Durable room state.
    store: Arc<dyn RoomStore>,
    /// Platform-side connection table.
    directory: Arc<dyn ConnectionDirectory>,
    /// Per-room tunables.
    settings: RoomSettings,
    /// Time of the last mailbox message.
    last_activity: Instant,
}

impl RoomActor {
    /// Spawn a new room actor.
    ///
    /// Returns a handle and the task join handle. The actor rebuilds its
    /// session registry from the connection directory before processing any
    /// message, so sessions attached by a previous incarnation keep
    /// receiving broadcasts.
    pub fn spawn(
        room_name: String,
        cancel_token: CancellationToken,
        store: Arc<dyn RoomStore>,
        directory: Arc<dyn ConnectionDirectory>,
        settings: RoomSettings,
    ) -> (RoomActorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(ROOM_CHANNEL_BUFFER);

        let actor = Self {
            room_name: room_name.clone(),
            receiver,
            cancel_token: cancel_token.clone(),
            registry: SessionRegistry::new(),
            store,
            directory,
            settings,
            last_activity: Instant::now(),
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = RoomActorHandle {
            sender,
            cancel_token,
            room_name,
        };

        (handle, task_handle)
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "rc.actor.room", fields(room = %self.room_name))]
    async fn run(mut self) {
        // The actor owns its slot in the gauge; every exit path below runs
        // the matching decrement, so the gauge tracks live actors rather
        // than supervisor map entries.
        metrics::gauge!("rc_active_rooms").increment(1.0);

        self.rebuild_registry().await;

        info!(
            target: "rc.actor.room",
            room = %self.room_name,
            sessions = self.registry.len(),
            "RoomActor started"
        );

        let mut idle_check = tokio::time::interval(IDLE_CHECK_INTERVAL);

        loop {
            tokio::select! {
                // Handle cancellation
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "rc.actor.room",
                        room = %self.room_name,
                        "RoomActor received cancellation signal"
                    );
                    break;
                }

                // Passivate after the configured idle period
                _ = idle_check.tick() => {
                    if self.last_activity.elapsed() >= self.settings.passivate_after {
                        info!(
                            target: "rc.actor.room",
                            room = %self.room_name,
                            idle_secs = self.last_activity.elapsed().as_secs(),
                            sessions = self.registry.len(),
                            "RoomActor passivating"
                        );
                        self.drain_mailbox().await;
                        break;
                    }
                }

                // Handle messages
                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.last_activity = Instant::now();
                            self.handle_message(message).await;
                        }
                        None => {
                            // Channel closed, exit
                            info!(
                                target: "rc.actor.room",
                                room = %self.room_name,
                                "RoomActor channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        metrics::gauge!("rc_active_rooms").decrement(1.0);
        info!(
            target: "rc.actor.room",
            room = %self.room_name,
            sessions = self.registry.len(),
            "RoomActor stopped"
        );
    }

    /// Close the mailbox and answer every message already queued in it.
    ///
    /// A sender racing the passivation decision lands in one of two places:
    /// already buffered, in which case this incarnation still answers it, or
    /// rejected by the closed channel, in which case the caller re-resolves
    /// the room through the supervisor and reaches the next incarnation.
    /// Either way no operation is silently dropped.
    async fn drain_mailbox(&mut self) {
        self.receiver.close();
        while let Some(message) = self.receiver.recv().await {
            self.handle_message(message).await;
        }
    }

    /// Rebuild the session registry from the connection directory.
    ///
    /// Every open connection carries the session id persisted when it was
    /// registered, so sessions attached by a previous incarnation resume
    /// under their original identity.
    async fn rebuild_registry(&mut self) {
        let open = self.directory.open_connections(&self.room_name).await;

        for conn in open {
            self.registry.add(
                conn.id,
                Session {
                    session_id: conn.session_id,
                    sender: conn.sender,
                },
            );
        }

        if !self.registry.is_empty() {
            debug!(
                target: "rc.actor.room",
                room = %self.room_name,
                sessions = self.registry.len(),
                "Registry rebuilt from connection directory"
            );
        }
    }

    /// Handle a single message.
    async fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::Connect { sender, respond_to } => {
                let connected = self.connect(sender).await;
                let _ = respond_to.send(connected);
            }

            RoomMessage::ListAtoms { respond_to } => {
                let result = self.store.read_atoms(&self.room_name).await;
                let _ = respond_to.send(result);
            }

            RoomMessage::AppendAtom {
                content,
                author,
                respond_to,
            } => {
                let result = self.append_atom(content, author).await;
                let _ = respond_to.send(result);
            }

            RoomMessage::GetMetadata { respond_to } => {
                let result = self.get_metadata().await;
                let _ = respond_to.send(result);
            }

            RoomMessage::ConnectionClosed { connection_id } => {
                self.connection_closed(connection_id).await;
            }
        }
    }

    /// Mint a session, register the connection, and track it.
    ///
    /// Registration and attachment are one directory operation: a rebuild
    /// running at any point either sees nothing or sees the fully attached
    /// connection, never an in-between state.
    async fn connect(&mut self, sender: mpsc::Sender<OutboundFrame>) -> ConnectedSession {
        let session_id = Uuid::new_v4().to_string();
        let connection_id = self
            .directory
            .register(&self.room_name, &session_id, sender.clone())
            .await;

        self.registry.add(
            connection_id,
            Session {
                session_id: session_id.clone(),
                sender,
            },
        );

        info!(
            target: "rc.actor.room",
            room = %self.room_name,
            connection_id = %connection_id,
            session_id = %session_id,
            sessions = self.registry.len(),
            "Session attached"
        );

        ConnectedSession {
            connection_id,
            session_id,
        }
    }

    /// Validate, persist, then broadcast a new atom.
    ///
    /// Ordering is load-bearing: the durable write completes before any
    /// session sees the frame, so a client that refetches history after a
    /// push always finds the atom.
    async fn append_atom(
        &mut self,
        content: Option<String>,
        author: Option<String>,
    ) -> Result<Atom, RoomError> {
        let content = match content {
            Some(c) if !c.is_empty() => c,
            _ => return Err(RoomError::Validation("Content is required".to_string())),
        };

        if content.len() > self.settings.max_content_bytes {
            return Err(RoomError::Validation(format!(
                "Content exceeds maximum size of {} bytes",
                self.settings.max_content_bytes
            )));
        }

        let atom = Atom::new(content, author);

        // Whole-value read-modify-write; the actor is the only writer
        let mut atoms = self.store.read_atoms(&self.room_name).await?;
        atoms.push(atom.clone());
        self.store.write_atoms(&self.room_name, &atoms).await?;

        metrics::counter!("rc_atoms_appended_total").increment(1);

        let frame = broadcast::new_atom_frame(&atom)?;
        let failed = broadcast::send_to_all(&frame, &self.registry);
        for connection_id in failed {
            self.registry.remove(connection_id);
            self.directory.remove(&self.room_name, connection_id).await;
        }

        debug!(
            target: "rc.actor.room",
            room = %self.room_name,
            atom_id = %atom.id,
            history_len = atoms.len(),
            sessions = self.registry.len(),
            "Atom appended and broadcast"
        );

        Ok(atom)
    }

    /// Fetch metadata, synthesizing and persisting it on first request.
    ///
    /// Idempotent: once stored, the same value is returned forever.
    async fn get_metadata(&mut self) -> Result<RoomMetadata, RoomError> {
        if let Some(metadata) = self.store.read_metadata(&self.room_name).await? {
            return Ok(metadata);
        }

        let metadata = RoomMetadata::for_room(&self.room_name);
        self.store
            .write_metadata(&self.room_name, &metadata)
            .await?;

        info!(
            target: "rc.actor.room",
            room = %self.room_name,
            "Room metadata created"
        );

        Ok(metadata)
    }

    /// Eagerly remove a closed connection's session.
    async fn connection_closed(&mut self, connection_id: ConnectionId) {
        if let Some(session) = self.registry.remove(connection_id) {
            debug!(
                target: "rc.actor.room",
                room = %self.room_name,
                connection_id = %connection_id,
                session_id = %session.session_id,
                sessions = self.registry.len(),
                "Session detached"
            );
        }
        self.directory.remove(&self.room_name, connection_id).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::connections::ConnectionGateway;
    use crate::storage::MemoryRoomStore;

    fn settings() -> RoomSettings {
        RoomSettings {
            passivate_after: Duration::from_secs(60),
            max_content_bytes: 4096,
        }
    }

    fn spawn_room(
        room: &str,
        store: &MemoryRoomStore,
        gateway: &Arc<ConnectionGateway>,
    ) -> (RoomActorHandle, JoinHandle<()>) {
        RoomActor::spawn(
            room.to_string(),
            CancellationToken::new(),
            Arc::new(store.clone()),
            Arc::clone(gateway) as Arc<dyn ConnectionDirectory>,
            settings(),
        )
    }

    async fn attach(
        handle: &RoomActorHandle,
    ) -> (ConnectionId, mpsc::Receiver<OutboundFrame>, String) {
        let (tx, rx) = mpsc::channel(16);
        let connected = handle.connect(tx).await.unwrap();
        (connected.connection_id, rx, connected.session_id)
    }

    #[tokio::test]
    async fn test_append_then_list_preserves_order() {
        let store = MemoryRoomStore::new();
        let gateway = Arc::new(ConnectionGateway::new());
        let (handle, _task) = spawn_room("newsroom", &store, &gateway);

        let first = handle
            .append_atom(Some("first".to_string()), None)
            .await
            .unwrap();
        let second = handle
            .append_atom(Some("second".to_string()), Some("desk".to_string()))
            .await
            .unwrap();

        let atoms = handle.list_atoms().await.unwrap();
        assert_eq!(atoms, vec![first.clone(), second.clone()]);
        assert_eq!(first.author, "Anonymous");
        assert_eq!(second.author, "desk");
    }

    #[tokio::test]
    async fn test_list_empty_room() {
        let store = MemoryRoomStore::new();
        let gateway = Arc::new(ConnectionGateway::new());
        let (handle, _task) = spawn_room("empty", &store, &gateway);

        assert!(handle.list_atoms().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_rejects_missing_or_empty_content() {
        let store = MemoryRoomStore::new();
        let gateway = Arc::new(ConnectionGateway::new());
        let (handle, _task) = spawn_room("newsroom", &store, &gateway);

        let missing = handle.append_atom(None, None).await;
        assert!(matches!(missing, Err(RoomError::Validation(_))));

        let empty = handle.append_atom(Some(String::new()), None).await;
        assert!(matches!(empty, Err(RoomError::Validation(_))));

        // Nothing persisted, no session saw anything
        assert!(handle.list_atoms().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_rejects_oversized_content() {
        let store = MemoryRoomStore::new();
        let gateway = Arc::new(ConnectionGateway::new());
        let (handle, _task) = RoomActor::spawn(
            "newsroom".to_string(),
            CancellationToken::new(),
            Arc::new(store.clone()),
            Arc::clone(&gateway) as Arc<dyn ConnectionDirectory>,
            RoomSettings {
                passivate_after: Duration::from_secs(60),
                max_content_bytes: 8,
            },
        );

        let result = handle
            .append_atom(Some("way past eight bytes".to_string()), None)
            .await;
        assert!(matches!(result, Err(RoomError::Validation(_))));
    }

    #[tokio::test]
    async fn test_append_broadcasts_to_all_sessions() {
        let store = MemoryRoomStore::new();
        let gateway = Arc::new(ConnectionGateway::new());
        let (handle, _task) = spawn_room("newsroom", &store, &gateway);

        let (_id_a, mut rx_a, session_a) = attach(&handle).await;
        let (_id_b, mut rx_b, session_b) = attach(&handle).await;
        assert_ne!(session_a, session_b);

        let atom = handle
            .append_atom(Some("breaking".to_string()), None)
            .await
            .unwrap();

        let frame_a = rx_a.recv().await.unwrap();
        let frame_b = rx_b.recv().await.unwrap();
        assert_eq!(frame_a, frame_b);

        let parsed: serde_json::Value = serde_json::from_str(&frame_a).unwrap();
        assert_eq!(parsed["type"], "new_atom");
        assert_eq!(parsed["atom"]["id"], atom.id.as_str());
    }

    #[tokio::test]
    async fn test_dead_session_is_removed_and_append_still_succeeds() {
        let store = MemoryRoomStore::new();
        let gateway = Arc::new(ConnectionGateway::new());
        let (handle, _task) = spawn_room("newsroom", &store, &gateway);

        let (id_dead, rx_dead, _) = attach(&handle).await;
        let (_id_live, mut rx_live, _) = attach(&handle).await;

        drop(rx_dead);

        let atom = handle
            .append_atom(Some("survives".to_string()), None)
            .await
            .unwrap();
        assert_eq!(atom.content, "survives");

        // Live session still got the frame
        assert!(rx_live.recv().await.is_some());

        // Dead connection was evicted from the gateway too
        let open = gateway.open_connections("newsroom").await;
        assert!(open.iter().all(|c| c.id != id_dead));
    }

    #[tokio::test]
    async fn test_connection_closed_detaches_session() {
        let store = MemoryRoomStore::new();
        let gateway = Arc::new(ConnectionGateway::new());
        let (handle, _task) = spawn_room("newsroom", &store, &gateway);

        let (id, mut rx, _) = attach(&handle).await;
        handle.connection_closed(id).await;

        handle
            .append_atom(Some("after close".to_string()), None)
            .await
            .unwrap();

        // Channel is dropped once the registry and gateway forget it
        assert_eq!(gateway.connection_count("newsroom").await, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_metadata_created_once_and_stable() {
        let store = MemoryRoomStore::new();
        let gateway = Arc::new(ConnectionGateway::new());
        let (handle, _task) = spawn_room("newsroom", &store, &gateway);

        let first = handle.get_metadata().await.unwrap();
        let second = handle.get_metadata().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.id, "newsroom");
        assert_eq!(first.name, "newsroom");
    }

    #[tokio::test]
    async fn test_connect_is_immediately_visible_in_directory() {
        let store = MemoryRoomStore::new();
        let gateway = Arc::new(ConnectionGateway::new());
        let (handle, _task) = spawn_room("newsroom", &store, &gateway);

        let (tx, _rx) = mpsc::channel(16);
        let connected = handle.connect(tx).await.unwrap();

        // The gateway holds exactly this connection, already attached
        assert_eq!(gateway.connection_count("newsroom").await, 1);
        let open = gateway.open_connections("newsroom").await;
        let conn = open.first().unwrap();
        assert_eq!(conn.id, connected.connection_id);
        assert_eq!(conn.session_id, connected.session_id);
    }

    #[tokio::test]
    async fn test_activation_rebuilds_registry_from_directory() {
        let store = MemoryRoomStore::new();
        let gateway = Arc::new(ConnectionGateway::new());

        // First incarnation attaches one session
        let (handle, task) = spawn_room("newsroom", &store, &gateway);
        let (id_attached, mut rx, session_id) = attach(&handle).await;

        // Passivate the first incarnation
        handle.cancel();
        task.await.unwrap();

        // Second incarnation rebuilds from the gateway
        let (handle, _task) = spawn_room("newsroom", &store, &gateway);
        let atom = handle
            .append_atom(Some("after reactivation".to_string()), None)
            .await
            .unwrap();

        // The session keeps receiving under its old identity
        let frame = rx.recv().await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed["atom"]["id"], atom.id.as_str());
        assert!(!session_id.is_empty());

        let open = gateway.open_connections("newsroom").await;
        assert!(open.iter().any(|c| c.id == id_attached));
    }

    #[tokio::test]
    async fn test_history_survives_passivation() {
        let store = MemoryRoomStore::new();
        let gateway = Arc::new(ConnectionGateway::new());

        let (handle, task) = spawn_room("newsroom", &store, &gateway);
        handle
            .append_atom(Some("persisted".to_string()), None)
            .await
            .unwrap();
        let metadata_before = handle.get_metadata().await.unwrap();

        handle.cancel();
        task.await.unwrap();

        let (handle, _task) = spawn_room("newsroom", &store, &gateway);
        let atoms = handle.list_atoms().await.unwrap();
        assert_eq!(atoms.len(), 1);
        let first = atoms.first().unwrap();
        assert_eq!(first.content, "persisted");

        // Metadata is not regenerated by the new incarnation
        assert_eq!(handle.get_metadata().await.unwrap(), metadata_before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_actor_passivates_when_idle() {
        let store = MemoryRoomStore::new();
        let gateway = Arc::new(ConnectionGateway::new());
        let (handle, task) = RoomActor::spawn(
            "newsroom".to_string(),
            CancellationToken::new(),
            Arc::new(store),
            Arc::clone(&gateway) as Arc<dyn ConnectionDirectory>,
            RoomSettings {
                passivate_after: Duration::from_secs(5),
                max_content_bytes: 4096,
            },
        );

        handle
            .append_atom(Some("last activity".to_string()), None)
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(10)).await;
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_traffic_defers_passivation() {
        let store = MemoryRoomStore::new();
        let gateway = Arc::new(ConnectionGateway::new());
        let (handle, task) = RoomActor::spawn(
            "newsroom".to_string(),
            CancellationToken::new(),
            Arc::new(store),
            Arc::clone(&gateway) as Arc<dyn ConnectionDirectory>,
            RoomSettings {
                passivate_after: Duration::from_secs(5),
                max_content_bytes: 4096,
            },
        );

        // Keep the room busy past the idle deadline
        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(3)).await;
            handle
                .append_atom(Some("still here".to_string()), None)
                .await
                .unwrap();
        }
        assert!(!task.is_finished());

        tokio::time::advance(Duration::from_secs(10)).await;
        task.await.unwrap();
    }
}
