//! Room HTTP handlers: atom history, append, metadata.

use crate::errors::RoomError;
use crate::model::{Atom, RoomMetadata};
use crate::routes::AppState;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Request body for appending an atom.
#[derive(Debug, Deserialize)]
pub struct AppendAtomRequest {
    /// Event payload. Required; rejected when missing or empty.
    pub content: Option<String>,
    /// Author display name. Defaults to "Anonymous".
    pub author: Option<String>,
}

/// Response envelope for the atom history.
#[derive(Serialize)]
pub struct AtomsResponse {
    pub atoms: Vec<Atom>,
}

/// Response envelope for a successful append.
#[derive(Serialize)]
pub struct AppendAtomResponse {
    pub success: bool,
    pub atom: Atom,
}

/// `GET /rooms/{room}/atoms` - full history, oldest first.
#[instrument(skip_all, fields(room = %room))]
pub async fn list_atoms(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<Json<AtomsResponse>, RoomError> {
    let atoms = state.supervisor.list_atoms(&room).await?;
    Ok(Json(AtomsResponse { atoms }))
}

/// `POST /rooms/{room}/atoms` - validate, persist, broadcast.
#[instrument(skip_all, fields(room = %room))]
pub async fn append_atom(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Json(request): Json<AppendAtomRequest>,
) -> Result<Json<AppendAtomResponse>, RoomError> {
    let atom = state
        .supervisor
        .append_atom(&room, request.content, request.author)
        .await?;
    Ok(Json(AppendAtomResponse {
        success: true,
        atom,
    }))
}

/// `GET /rooms/{room}/metadata` - metadata, created on first request.
#[instrument(skip_all, fields(room = %room))]
pub async fn get_metadata(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<Json<RoomMetadata>, RoomError> {
    let metadata = state.supervisor.get_metadata(&room).await?;
    Ok(Json(metadata))
}
