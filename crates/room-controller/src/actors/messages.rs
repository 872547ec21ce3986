//! Message types for the room actor mailbox.

use crate::connections::{ConnectionId, OutboundFrame};
use crate::errors::RoomError;
use crate::model::{Atom, RoomMetadata};
use tokio::sync::{mpsc, oneshot};

/// Reply to a successful `Connect`.
#[derive(Debug, Clone)]
pub struct ConnectedSession {
    /// Directory-assigned connection id.
    pub connection_id: ConnectionId,
    /// Freshly minted session id, persisted as the connection's attachment.
    pub session_id: String,
}

/// Messages handled by a `RoomActor`.
///
/// Request/response operations carry a `respond_to` oneshot; notifications
/// are fire-and-forget.
pub enum RoomMessage {
    /// A new WebSocket connection wants a session in this room.
    Connect {
        sender: mpsc::Sender<OutboundFrame>,
        respond_to: oneshot::Sender<ConnectedSession>,
    },

    /// Read the full atom history, oldest first.
    ListAtoms {
        respond_to: oneshot::Sender<Result<Vec<Atom>, RoomError>>,
    },

    /// Validate, persist, and broadcast a new atom.
    AppendAtom {
        content: Option<String>,
        author: Option<String>,
        respond_to: oneshot::Sender<Result<Atom, RoomError>>,
    },

    /// Fetch room metadata, creating it on first request.
    GetMetadata {
        respond_to: oneshot::Sender<Result<RoomMetadata, RoomError>>,
    },

    /// A connection's socket closed or errored.
    ConnectionClosed { connection_id: ConnectionId },
}
