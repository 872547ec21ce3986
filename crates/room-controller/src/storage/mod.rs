//! Durable room state.
//!
//! The [`RoomStore`] trait is the seam between the room actor and its
//! persistence. Production uses [`RedisRoomStore`]; tests use
//! [`MemoryRoomStore`].
//!
//! # Consistency
//!
//! Once a write returns `Ok`, every subsequent read - from this actor
//! incarnation or any future one - observes it. The room actor is the only
//! writer for its room, so the whole-value read-modify-write on the atom
//! list is linearizable without any store-side coordination.

mod memory;
mod redis;

pub use memory::MemoryRoomStore;
pub use redis::RedisRoomStore;

use crate::errors::RoomError;
use crate::model::{Atom, RoomMetadata};
use async_trait::async_trait;

/// Durable storage capability for one room's state.
///
/// The atom history for a room is stored as a single value. That keeps the
/// log fully consistent under the actor's single-writer discipline, at the
/// cost of a whole-history rewrite per append and a ceiling at the store's
/// single-value size limit.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Read the full atom history, oldest first. Empty if never written.
    async fn read_atoms(&self, room: &str) -> Result<Vec<Atom>, RoomError>;

    /// Replace the full atom history.
    async fn write_atoms(&self, room: &str, atoms: &[Atom]) -> Result<(), RoomError>;

    /// Read stored metadata, if any.
    async fn read_metadata(&self, room: &str) -> Result<Option<RoomMetadata>, RoomError>;

    /// Store metadata.
    async fn write_metadata(&self, room: &str, metadata: &RoomMetadata) -> Result<(), RoomError>;
}
