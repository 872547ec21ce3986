//! WebSocket attach endpoint and per-connection socket task.
//!
//! The socket task sits below the actor: it forwards broadcast frames from
//! the connection's outbound channel and answers the `"ping"` keep-alive
//! locally, without waking the room actor. Only connection lifecycle events
//! (attach, close) cross the mailbox.

use crate::connections::OutboundFrame;
use crate::errors::RoomError;
use crate::routes::AppState;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    extract::ws::rejection::WebSocketUpgradeRejection,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

/// `/rooms/{room}/websocket` - attach a live session.
///
/// Routed for every method: anything that is not a proper GET upgrade
/// handshake (missing headers, wrong method) is a client error, reported as
/// 426 Upgrade Required rather than whatever the default rejection would be.
#[instrument(skip_all, fields(room = %room))]
pub async fn websocket_handler(
    State(state): State<AppState>,
    Path(room): Path<String>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, RoomError> {
    let upgrade = upgrade.map_err(|_| RoomError::UpgradeRequired)?;
    Ok(upgrade.on_upgrade(move |socket| handle_socket(socket, state, room)))
}

/// Drive one WebSocket connection until it closes.
async fn handle_socket(socket: WebSocket, state: AppState, room: String) {
    let (frame_tx, mut frame_rx) = mpsc::channel::<OutboundFrame>(state.outbound_queue_capacity);

    // The actor registers the connection and its session attachment with the
    // gateway in one step, so an activating actor never enumerates a
    // half-attached connection.
    let connected = match state.supervisor.connect(&room, frame_tx).await {
        Ok(connected) => connected,
        Err(e) => {
            warn!(
                target: "rc.routes.ws",
                room = %room,
                error = %e,
                "Failed to attach session, dropping connection"
            );
            return;
        }
    };
    let connection_id = connected.connection_id;
    let session_id = connected.session_id;

    debug!(
        target: "rc.routes.ws",
        room = %room,
        connection_id = %connection_id,
        session_id = %session_id,
        "WebSocket session attached"
    );

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            // Broadcast frames from the room actor
            frame = frame_rx.recv() => {
                match frame {
                    Some(frame) => {
                        if sink.send(Message::Text(frame.to_string())).await.is_err() {
                            break;
                        }
                    }
                    // Outbound channel dropped: the connection was evicted
                    None => break,
                }
            }

            // Inbound client traffic
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        // Keep-alive handled here; never reaches the actor
                        if text == "ping"
                            && sink.send(Message::Text("pong".to_string())).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(
                            target: "rc.routes.ws",
                            room = %room,
                            connection_id = %connection_id,
                            error = %e,
                            "WebSocket read error"
                        );
                        break;
                    }
                }
            }
        }
    }

    // Eager cleanup; a passivated actor simply won't have the entry
    state.supervisor.connection_closed(&room, connection_id).await;
    state.directory.remove(&room, connection_id).await;

    debug!(
        target: "rc.routes.ws",
        room = %room,
        connection_id = %connection_id,
        session_id = %session_id,
        "WebSocket session closed"
    );
}
