//! Connection gateway: the platform-side connection table.

use crate::connections::OutboundFrame;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

/// Stable identifier for one live connection.
///
/// Assigned at accept time and valid for the lifetime of the underlying
/// socket, across any number of room actor incarnations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// One open connection as seen by an activating room actor.
pub struct OpenConnection {
    /// Stable connection id.
    pub id: ConnectionId,
    /// Session attachment persisted when the connection was registered.
    pub session_id: String,
    /// Outbound frame channel for this connection.
    pub sender: mpsc::Sender<OutboundFrame>,
}

/// Directory of live connections per room.
///
/// The seam between the actor and the transport layer: actors only ever see
/// connection ids and senders, never sockets. Registration carries the
/// session attachment, so a connection is never visible here without one:
/// an activating actor can trust every entry it enumerates.
#[async_trait]
pub trait ConnectionDirectory: Send + Sync {
    /// Register a newly accepted connection under its session id.
    async fn register(
        &self,
        room: &str,
        session_id: &str,
        sender: mpsc::Sender<OutboundFrame>,
    ) -> ConnectionId;

    /// Enumerate open connections for a room (activation source).
    async fn open_connections(&self, room: &str) -> Vec<OpenConnection>;

    /// Drop a connection from the table.
    async fn remove(&self, room: &str, id: ConnectionId);
}

struct GatewayEntry {
    session_id: String,
    sender: mpsc::Sender<OutboundFrame>,
}

/// Production [`ConnectionDirectory`]: per-room connection tables behind a
/// single `RwLock`, with a process-wide id counter.
#[derive(Default)]
pub struct ConnectionGateway {
    next_id: AtomicU64,
    rooms: RwLock<HashMap<String, HashMap<ConnectionId, GatewayEntry>>>,
}

impl ConnectionGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open connections for a room.
    pub async fn connection_count(&self, room: &str) -> usize {
        self.rooms
            .read()
            .await
            .get(room)
            .map_or(0, HashMap::len)
    }
}

#[async_trait]
impl ConnectionDirectory for ConnectionGateway {
    async fn register(
        &self,
        room: &str,
        session_id: &str,
        sender: mpsc::Sender<OutboundFrame>,
    ) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let mut rooms = self.rooms.write().await;
        rooms.entry(room.to_string()).or_default().insert(
            id,
            GatewayEntry {
                session_id: session_id.to_string(),
                sender,
            },
        );

        metrics::gauge!("rc_open_connections").increment(1.0);
        debug!(
            target: "rc.connections.gateway",
            room = %room,
            connection_id = %id,
            session_id = %session_id,
            "Connection registered"
        );

        id
    }

    async fn open_connections(&self, room: &str) -> Vec<OpenConnection> {
        let rooms = self.rooms.read().await;
        rooms.get(room).map_or_else(Vec::new, |conns| {
            conns
                .iter()
                .map(|(id, entry)| OpenConnection {
                    id: *id,
                    session_id: entry.session_id.clone(),
                    sender: entry.sender.clone(),
                })
                .collect()
        })
    }

    async fn remove(&self, room: &str, id: ConnectionId) {
        let mut rooms = self.rooms.write().await;
        if let Some(conns) = rooms.get_mut(room) {
            if conns.remove(&id).is_some() {
                metrics::gauge!("rc_open_connections").decrement(1.0);
                debug!(
                    target: "rc.connections.gateway",
                    room = %room,
                    connection_id = %id,
                    "Connection removed"
                );
            }
            if conns.is_empty() {
                rooms.remove(room);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn frame_channel() -> (mpsc::Sender<OutboundFrame>, mpsc::Receiver<OutboundFrame>) {
        mpsc::channel(8)
    }

    #[tokio::test]
    async fn test_register_assigns_distinct_ids() {
        let gateway = ConnectionGateway::new();
        let (tx, _rx) = frame_channel();

        let a = gateway.register("newsroom", "session-a", tx.clone()).await;
        let b = gateway.register("newsroom", "session-b", tx).await;

        assert_ne!(a, b);
        assert_eq!(gateway.connection_count("newsroom").await, 2);
    }

    #[tokio::test]
    async fn test_registration_carries_session_attachment() {
        let gateway = ConnectionGateway::new();
        let (tx, _rx) = frame_channel();

        let id = gateway.register("newsroom", "session-1", tx).await;

        // Visible immediately, already attached
        let open = gateway.open_connections("newsroom").await;
        assert_eq!(open.len(), 1);
        let conn = open.first().unwrap();
        assert_eq!(conn.id, id);
        assert_eq!(conn.session_id, "session-1");
    }

    #[tokio::test]
    async fn test_remove_drops_connection_and_empty_room() {
        let gateway = ConnectionGateway::new();
        let (tx, _rx) = frame_channel();

        let id = gateway.register("newsroom", "session-1", tx).await;
        gateway.remove("newsroom", id).await;

        assert_eq!(gateway.connection_count("newsroom").await, 0);
        assert!(gateway.open_connections("newsroom").await.is_empty());
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let gateway = ConnectionGateway::new();
        let (tx, _rx) = frame_channel();

        gateway.register("a", "session-1", tx).await;

        assert_eq!(gateway.connection_count("a").await, 1);
        assert_eq!(gateway.connection_count("b").await, 0);
    }
}
