//! Room Controller (RC) Service Library
//!
//! This library provides the core functionality for the Roomcast
//! Room Controller - a stateful WebSocket broadcast server responsible for:
//!
//! - Durable, append-only event history per room ("atoms")
//! - Real-time fan-out of new atoms to every attached WebSocket session
//! - Lazy room metadata creation
//! - Idle passivation and transparent reactivation of room actors
//!
//! # Architecture
//!
//! One actor per active room, supervised lazily:
//!
//! ```text
//! RoomSupervisor (singleton per RC instance)
//! ├── spawns one RoomActor per active room
//! │   └── RoomActor (single point of serialization for its room)
//! │       ├── owns the session registry
//! │       └── drives storage + broadcast
//! └── ConnectionGateway (outlives actors; holds live sockets)
//! ```
//!
//! # Key Design Decisions
//!
//! - **Actor as cache**: the in-memory session registry is derived state.
//!   The gateway's connection table plus Redis are authoritative, so an
//!   idle actor can simply exit and be rebuilt on the next operation.
//! - **Persist then broadcast**: an atom is durably written before any
//!   session sees it. A reader who refetches after a push never misses it.
//! - **Failure isolation**: a dead session never blocks delivery to the
//!   rest; it is removed eagerly and the append still succeeds.
//!
//! # Modules
//!
//! - [`actors`] - Room actor, supervisor, registry, broadcast
//! - [`connections`] - Connection gateway (survives passivation)
//! - [`storage`] - Durable room state (Redis, plus in-memory for tests)
//! - [`routes`] - HTTP/WebSocket surface
//! - [`config`] - Service configuration from environment
//! - [`errors`] - Error types with HTTP status mapping

pub mod actors;
pub mod config;
pub mod connections;
pub mod errors;
pub mod model;
pub mod observability;
pub mod routes;
pub mod storage;
