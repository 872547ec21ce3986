//! Shared utilities for Roomcast services.
//!
//! Currently this crate carries the secret-handling types used by service
//! configuration. Anything needed by more than one crate lands here.

pub mod secret;
