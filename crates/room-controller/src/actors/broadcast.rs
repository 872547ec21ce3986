//! Broadcast fan-out for new atoms.
//!
//! The wire frame is serialized exactly once and shared across all
//! recipients as an `Arc<str>`. Delivery uses `try_send` so a slow or dead
//! session can never block the actor loop; failed connection ids are
//! returned to the caller for eager removal.

use crate::actors::registry::SessionRegistry;
use crate::connections::{ConnectionId, OutboundFrame};
use crate::errors::RoomError;
use crate::model::Atom;
use serde::Serialize;
use tracing::warn;

/// Push frame sent to every attached session when an atom is appended.
#[derive(Serialize)]
struct NewAtomFrame<'a> {
    #[serde(rename = "type")]
    frame_type: &'static str,
    atom: &'a Atom,
}

/// Serialize the `new_atom` push frame for one atom.
pub fn new_atom_frame(atom: &Atom) -> Result<OutboundFrame, RoomError> {
    let frame = NewAtomFrame {
        frame_type: "new_atom",
        atom,
    };
    let json = serde_json::to_string(&frame)
        .map_err(|e| RoomError::Internal(format!("failed to serialize push frame: {e}")))?;
    Ok(OutboundFrame::from(json))
}

/// Deliver one frame to every session in the registry.
///
/// A failed send (closed or full channel) never aborts delivery to the
/// remaining sessions. Returns the connection ids whose send failed so the
/// actor can remove them.
pub fn send_to_all(frame: &OutboundFrame, registry: &SessionRegistry) -> Vec<ConnectionId> {
    let mut failed = Vec::new();

    for (connection_id, session) in registry.iter() {
        if let Err(e) = session.sender.try_send(OutboundFrame::clone(frame)) {
            warn!(
                target: "rc.actor.broadcast",
                connection_id = %connection_id,
                session_id = %session.session_id,
                error = %e,
                "Failed to deliver frame, marking session for removal"
            );
            metrics::counter!("rc_broadcast_failures_total").increment(1);
            failed.push(connection_id);
        }
    }

    failed
}
