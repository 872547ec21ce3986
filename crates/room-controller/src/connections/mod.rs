//! Live connection bookkeeping.
//!
//! The gateway lives outside the actor system on purpose: room actors
//! passivate when idle, but their WebSocket connections stay open. The
//! gateway holds each socket's outbound channel plus the session attachment
//! the actor persisted, so a freshly activated actor can rebuild its
//! session registry from here.

mod gateway;

pub use gateway::{ConnectionDirectory, ConnectionGateway, ConnectionId, OpenConnection};

use std::sync::Arc;

/// A serialized outbound text frame, shared across all recipients.
pub type OutboundFrame = Arc<str>;
