//! In-memory room store for tests.

use crate::errors::RoomError;
use crate::model::{Atom, RoomMetadata};
use crate::storage::RoomStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory implementation of [`RoomStore`].
///
/// Shared via `Arc`, so the same store can back several actor incarnations
/// in a test and stand in for durable state across passivation.
#[derive(Clone, Default)]
pub struct MemoryRoomStore {
    atoms: Arc<Mutex<HashMap<String, Vec<Atom>>>>,
    metadata: Arc<Mutex<HashMap<String, RoomMetadata>>>,
}

impl MemoryRoomStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn read_atoms(&self, room: &str) -> Result<Vec<Atom>, RoomError> {
        Ok(self
            .atoms
            .lock()
            .await
            .get(room)
            .cloned()
            .unwrap_or_default())
    }

    async fn write_atoms(&self, room: &str, atoms: &[Atom]) -> Result<(), RoomError> {
        self.atoms
            .lock()
            .await
            .insert(room.to_string(), atoms.to_vec());
        Ok(())
    }

    async fn read_metadata(&self, room: &str) -> Result<Option<RoomMetadata>, RoomError> {
        Ok(self.metadata.lock().await.get(room).cloned())
    }

    async fn write_metadata(&self, room: &str, metadata: &RoomMetadata) -> Result<(), RoomError> {
        self.metadata
            .lock()
            .await
            .insert(room.to_string(), metadata.clone());
        Ok(())
    }
}
