//! Actor model implementation.
//!
//! One `RoomActor` per active room, spawned lazily by the `RoomSupervisor`.
//! The actor owns all in-memory state for its room and is the single point
//! of serialization for every room operation.

mod broadcast;
mod messages;
mod registry;
mod room;
mod supervisor;

pub use broadcast::new_atom_frame;
pub use messages::{ConnectedSession, RoomMessage};
pub use registry::{Session, SessionRegistry};
pub use room::{RoomActor, RoomActorHandle, RoomSettings};
pub use supervisor::RoomSupervisor;
