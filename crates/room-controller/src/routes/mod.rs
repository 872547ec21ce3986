//! HTTP/WebSocket surface.
//!
//! The router is a thin front door: handlers parse the request into a typed
//! room operation and hand it to the supervisor, which resolves the room's
//! actor. All room semantics live behind the actor mailbox.

mod rooms;
mod ws;

use crate::actors::RoomSupervisor;
use crate::connections::ConnectionDirectory;
use crate::errors::RoomError;

use axum::{
    routing::{any, get},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Default request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Room actor supervisor.
    pub supervisor: Arc<RoomSupervisor>,
    /// Live connection table (outlives room actors).
    pub directory: Arc<dyn ConnectionDirectory>,
    /// Per-connection outbound frame queue capacity.
    pub outbound_queue_capacity: usize,
}

/// Build the application router.
pub fn build_routes(state: AppState) -> Router {
    // The websocket route takes any method: the handler reports every
    // non-upgrade request, wrong method included, as 426 rather than the
    // router's default 405.
    Router::new()
        .route("/rooms/:room/websocket", any(ws::websocket_handler))
        .route(
            "/rooms/:room/atoms",
            get(rooms::list_atoms).post(rooms::append_atom),
        )
        .route("/rooms/:room/metadata", get(rooms::get_metadata))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}

/// Any unrecognized path is a 404.
async fn fallback_handler() -> RoomError {
    RoomError::NotFound("Resource not found".to_string())
}
