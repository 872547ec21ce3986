//! Redis-backed room store.
//!
//! # Key Patterns
//!
//! - `room:{name}:atoms` - atom history (JSON array)
//! - `room:{name}:metadata` - room metadata (JSON)
//!
//! # Connection Pattern
//!
//! The redis-rs `MultiplexedConnection` is designed to be cloned cheaply and
//! used concurrently. No locking is needed - just clone the connection for
//! each operation.

use crate::errors::RoomError;
use crate::model::{Atom, RoomMetadata};
use crate::storage::RoomStore;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use tracing::{error, instrument, warn};

/// Redis-backed implementation of [`RoomStore`].
///
/// Cheaply cloneable - the underlying `MultiplexedConnection` is designed to
/// be shared across tasks.
#[derive(Clone)]
pub struct RedisRoomStore {
    /// Redis client (kept for potential reconnection scenarios).
    #[allow(dead_code)]
    client: Client,
    /// Multiplexed connection (cheaply cloneable, designed for concurrent use).
    connection: MultiplexedConnection,
}

impl RedisRoomStore {
    /// Create a new Redis room store.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., `redis://localhost:6379`)
    ///
    /// # Errors
    ///
    /// Returns `RoomError::Storage` if connection fails.
    pub async fn new(redis_url: &str) -> Result<Self, RoomError> {
        let client = Client::open(redis_url).map_err(|e| {
            // Note: Do NOT log redis_url as it may contain credentials
            // (e.g., redis://:password@host:port)
            error!(
                target: "rc.storage.redis",
                error = %e,
                "Failed to open Redis client"
            );
            RoomError::Storage(format!("Failed to open Redis client: {e}"))
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(
                    target: "rc.storage.redis",
                    error = %e,
                    "Failed to connect to Redis"
                );
                RoomError::Storage(format!("Failed to connect to Redis: {e}"))
            })?;

        Ok(Self { client, connection })
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, RoomError> {
        // Clone the connection (cheap operation) for this request
        let mut conn = self.connection.clone();

        let raw: Option<String> = conn.get(key).await.map_err(|e| {
            warn!(
                target: "rc.storage.redis",
                error = %e,
                key = %key,
                "Failed to read key"
            );
            RoomError::Storage(format!("Failed to read {key}: {e}"))
        })?;

        match raw {
            Some(json) => {
                let value = serde_json::from_str(&json).map_err(|e| {
                    error!(
                        target: "rc.storage.redis",
                        error = %e,
                        key = %key,
                        "Stored value is not valid JSON"
                    );
                    RoomError::Storage(format!("Corrupt value at {key}: {e}"))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn write_json<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<(), RoomError> {
        let mut conn = self.connection.clone();

        let json = serde_json::to_string(value)
            .map_err(|e| RoomError::Storage(format!("Failed to serialize {key}: {e}")))?;

        let () = conn.set(key, json).await.map_err(|e| {
            warn!(
                target: "rc.storage.redis",
                error = %e,
                key = %key,
                "Failed to write key"
            );
            RoomError::Storage(format!("Failed to write {key}: {e}"))
        })?;

        Ok(())
    }
}

#[async_trait]
impl RoomStore for RedisRoomStore {
    #[instrument(skip_all, fields(room = %room))]
    async fn read_atoms(&self, room: &str) -> Result<Vec<Atom>, RoomError> {
        let key = format!("room:{room}:atoms");
        Ok(self.read_json(&key).await?.unwrap_or_default())
    }

    #[instrument(skip_all, fields(room = %room, atom_count = atoms.len()))]
    async fn write_atoms(&self, room: &str, atoms: &[Atom]) -> Result<(), RoomError> {
        let key = format!("room:{room}:atoms");
        self.write_json(&key, &atoms).await
    }

    #[instrument(skip_all, fields(room = %room))]
    async fn read_metadata(&self, room: &str) -> Result<Option<RoomMetadata>, RoomError> {
        let key = format!("room:{room}:metadata");
        self.read_json(&key).await
    }

    #[instrument(skip_all, fields(room = %room))]
    async fn write_metadata(&self, room: &str, metadata: &RoomMetadata) -> Result<(), RoomError> {
        let key = format!("room:{room}:metadata");
        self.write_json(&key, metadata).await
    }
}
