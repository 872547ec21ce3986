//! In-memory session registry.
//!
//! Owned exclusively by a `RoomActor`, so no locking: the mailbox
//! serializes all access. The registry is derived state - it can always be
//! rebuilt from the connection directory, which is what a freshly activated
//! actor does.

use crate::connections::{ConnectionId, OutboundFrame};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// One attached session.
#[derive(Clone)]
pub struct Session {
    /// Session identifier (UUIDv4), persisted as the connection attachment.
    pub session_id: String,
    /// Outbound frame channel for this session's socket.
    pub sender: mpsc::Sender<OutboundFrame>,
}

/// Sessions currently attached to a room, keyed by connection id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<ConnectionId, Session>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, connection_id: ConnectionId, session: Session) {
        self.sessions.insert(connection_id, session);
    }

    /// Remove a session; returns it if it was present.
    pub fn remove(&mut self, connection_id: ConnectionId) -> Option<Session> {
        self.sessions.remove(&connection_id)
    }

    #[must_use]
    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.sessions.contains_key(&connection_id)
    }

    /// Iterate over all sessions.
    pub fn iter(&self) -> impl Iterator<Item = (ConnectionId, &Session)> {
        self.sessions.iter().map(|(id, s)| (*id, s))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::connections::{ConnectionDirectory, ConnectionGateway};

    async fn connection_id(gateway: &ConnectionGateway) -> ConnectionId {
        let (tx, _rx) = mpsc::channel(1);
        gateway.register("test", "session", tx).await
    }

    fn session(id: &str) -> Session {
        let (tx, _rx) = mpsc::channel(1);
        Session {
            session_id: id.to_string(),
            sender: tx,
        }
    }

    #[tokio::test]
    async fn test_add_and_remove() {
        let gateway = ConnectionGateway::new();
        let id = connection_id(&gateway).await;

        let mut registry = SessionRegistry::new();
        registry.add(id, session("s1"));

        assert!(registry.contains(id));
        assert_eq!(registry.len(), 1);

        let removed = registry.remove(id).unwrap();
        assert_eq!(removed.session_id, "s1");
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let gateway = ConnectionGateway::new();
        let id = connection_id(&gateway).await;

        let mut registry = SessionRegistry::new();
        registry.add(id, session("s1"));

        assert!(registry.remove(id).is_some());
        assert!(registry.remove(id).is_none());
    }
}
