//! `RoomSupervisor` - lazily maps room names to live actor incarnations.
//!
//! The supervisor guarantees at most one live `RoomActor` per room name.
//! Actors passivate on their own when idle; the supervisor detects the
//! finished task (or the closed mailbox of an actor mid-exit) on the next
//! operation and spawns a fresh incarnation. A plain mutex-guarded map is
//! enough here: it is touched once per HTTP request, never on the
//! broadcast path.
//!
//! Callers go through the operation wrappers (`list_atoms`, `append_atom`,
//! `get_metadata`, `connect`) rather than raw handles: a handle resolved
//! just before its actor passivates fails with a closed channel, and the
//! wrappers retry once against the next incarnation so the race never
//! surfaces to a client.

use crate::actors::messages::ConnectedSession;
use crate::actors::room::{RoomActor, RoomActorHandle, RoomSettings};
use crate::connections::{ConnectionDirectory, ConnectionId, OutboundFrame};
use crate::errors::RoomError;
use crate::model::{Atom, RoomMetadata};
use crate::storage::RoomStore;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Internal state for a managed room.
struct ManagedRoom {
    /// Handle to the room actor.
    handle: RoomActorHandle,
    /// Join handle for monitoring the actor task.
    task_handle: JoinHandle<()>,
}

/// Supervisor for room actors.
pub struct RoomSupervisor {
    /// Managed rooms by name.
    rooms: Mutex<HashMap<String, ManagedRoom>>,
    /// Durable room state, shared by every actor.
    store: Arc<dyn RoomStore>,
    /// Platform-side connection table, shared by every actor.
    directory: Arc<dyn ConnectionDirectory>,
    /// Per-room tunables.
    settings: RoomSettings,
    /// Root cancellation token; each actor gets a child.
    cancel_token: CancellationToken,
}

impl RoomSupervisor {
    #[must_use]
    pub fn new(
        store: Arc<dyn RoomStore>,
        directory: Arc<dyn ConnectionDirectory>,
        settings: RoomSettings,
    ) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            store,
            directory,
            settings,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Get a child token for tasks that should stop with the supervisor.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }

    /// Get the handle for a room, spawning or reactivating its actor.
    ///
    /// A finished task means the previous incarnation passivated (or
    /// panicked); a closed mailbox means it is passivating right now. Either
    /// way it is replaced, and the new actor rebuilds its registry from the
    /// connection directory on startup.
    pub async fn room(&self, room_name: &str) -> RoomActorHandle {
        let mut rooms = self.rooms.lock().await;

        if let Some(managed) = rooms.get(room_name) {
            if !managed.task_handle.is_finished() && !managed.handle.is_closed() {
                return managed.handle.clone();
            }
            debug!(
                target: "rc.actor.supervisor",
                room = %room_name,
                "Previous room actor finished, reactivating"
            );
            if let Some(managed) = rooms.remove(room_name) {
                // A passivating actor may still be draining queued messages;
                // wait for it so there is never more than one writer per room.
                let _ = managed.task_handle.await;
            }
        }

        let (handle, task_handle) = RoomActor::spawn(
            room_name.to_string(),
            self.cancel_token.child_token(),
            Arc::clone(&self.store),
            Arc::clone(&self.directory),
            self.settings.clone(),
        );

        rooms.insert(
            room_name.to_string(),
            ManagedRoom {
                handle: handle.clone(),
                task_handle,
            },
        );

        info!(
            target: "rc.actor.supervisor",
            room = %room_name,
            active_rooms = rooms.len(),
            "Room actor spawned"
        );

        handle
    }

    /// Attach a new connection to a room.
    pub async fn connect(
        &self,
        room_name: &str,
        sender: mpsc::Sender<OutboundFrame>,
    ) -> Result<ConnectedSession, RoomError> {
        let handle = self.room(room_name).await;
        match handle.connect(sender.clone()).await {
            Err(_) if handle.is_closed() => {
                log_retry(room_name, "connect");
                self.room(room_name).await.connect(sender).await
            }
            result => result,
        }
    }

    /// Read a room's full atom history, oldest first.
    pub async fn list_atoms(&self, room_name: &str) -> Result<Vec<Atom>, RoomError> {
        let handle = self.room(room_name).await;
        match handle.list_atoms().await {
            Err(_) if handle.is_closed() => {
                log_retry(room_name, "list_atoms");
                self.room(room_name).await.list_atoms().await
            }
            result => result,
        }
    }

    /// Validate, persist, and broadcast a new atom in a room.
    pub async fn append_atom(
        &self,
        room_name: &str,
        content: Option<String>,
        author: Option<String>,
    ) -> Result<Atom, RoomError> {
        let handle = self.room(room_name).await;
        match handle.append_atom(content.clone(), author.clone()).await {
            Err(_) if handle.is_closed() => {
                log_retry(room_name, "append_atom");
                self.room(room_name).await.append_atom(content, author).await
            }
            result => result,
        }
    }

    /// Fetch a room's metadata, creating it on first request.
    pub async fn get_metadata(&self, room_name: &str) -> Result<RoomMetadata, RoomError> {
        let handle = self.room(room_name).await;
        match handle.get_metadata().await {
            Err(_) if handle.is_closed() => {
                log_retry(room_name, "get_metadata");
                self.room(room_name).await.get_metadata().await
            }
            result => result,
        }
    }

    /// Report a closed connection to the room's actor, if one is live.
    ///
    /// Never spawns: a passivated actor has no registry entry to clean up,
    /// and its next incarnation rebuilds from the directory anyway.
    pub async fn connection_closed(&self, room_name: &str, connection_id: ConnectionId) {
        let rooms = self.rooms.lock().await;
        if let Some(managed) = rooms.get(room_name) {
            if !managed.task_handle.is_finished() {
                managed.handle.connection_closed(connection_id).await;
            }
        }
    }

    /// Number of live (non-finished) room actors.
    pub async fn active_rooms(&self) -> usize {
        let rooms = self.rooms.lock().await;
        rooms
            .values()
            .filter(|m| !m.task_handle.is_finished())
            .count()
    }

    /// Graceful shutdown: cancel every actor and wait for the tasks.
    pub async fn shutdown(&self, deadline: Duration) {
        info!(
            target: "rc.actor.supervisor",
            deadline_secs = deadline.as_secs(),
            "Shutting down room actors"
        );

        self.cancel_token.cancel();

        let mut rooms = self.rooms.lock().await;
        for (room_name, managed) in rooms.drain() {
            match tokio::time::timeout(deadline, managed.task_handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(
                        target: "rc.actor.supervisor",
                        room = %room_name,
                        error = %e,
                        "Room actor task failed during shutdown"
                    );
                }
                Err(_) => {
                    warn!(
                        target: "rc.actor.supervisor",
                        room = %room_name,
                        "Room actor did not stop before deadline"
                    );
                }
            }
        }

        info!(target: "rc.actor.supervisor", "Room actors stopped");
    }
}

fn log_retry(room_name: &str, operation: &str) {
    debug!(
        target: "rc.actor.supervisor",
        room = %room_name,
        operation = %operation,
        "Room actor passivated mid-operation, retrying on fresh incarnation"
    );
}
