//! Core data types for room state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Author recorded when an append request does not name one.
pub const DEFAULT_AUTHOR: &str = "Anonymous";

/// A single immutable event in a room's history.
///
/// Atoms are append-only: once created they are never mutated, and their
/// position in the history is their creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Atom {
    /// Unique atom identifier (UUIDv4).
    pub id: String,
    /// Event payload.
    pub content: String,
    /// Creation time, milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Author display name ("Anonymous" when not supplied).
    pub author: String,
}

impl Atom {
    /// Create a new atom stamped with a fresh id and the current time.
    #[must_use]
    pub fn new(content: String, author: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content,
            timestamp: chrono::Utc::now().timestamp_millis(),
            author: author.unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
        }
    }
}

/// Room metadata, created lazily on first request.
///
/// `id` is derived from the room name so every incarnation of the room
/// computes the same value; `created_at` is fixed at first creation and
/// never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMetadata {
    /// Stable room identifier (the room name).
    pub id: String,
    /// Display name.
    pub name: String,
    /// First-seen time, milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl RoomMetadata {
    /// Synthesize metadata for a room seen for the first time.
    #[must_use]
    pub fn for_room(room_name: &str) -> Self {
        Self {
            id: room_name.to_string(),
            name: room_name.to_string(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_defaults_author_to_anonymous() {
        let atom = Atom::new("hello".to_string(), None);
        assert_eq!(atom.author, "Anonymous");
        assert_eq!(atom.content, "hello");
        assert!(!atom.id.is_empty());
        assert!(atom.timestamp > 0);
    }

    #[test]
    fn test_atom_keeps_explicit_author() {
        let atom = Atom::new("hello".to_string(), Some("jane".to_string()));
        assert_eq!(atom.author, "jane");
    }

    #[test]
    fn test_atom_ids_are_unique() {
        let a = Atom::new("x".to_string(), None);
        let b = Atom::new("x".to_string(), None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_atom_serde_round_trip() {
        let atom = Atom::new("breaking".to_string(), Some("desk".to_string()));
        let json = serde_json::to_string(&atom).unwrap();
        let back: Atom = serde_json::from_str(&json).unwrap();
        assert_eq!(atom, back);
    }

    #[test]
    fn test_metadata_id_is_deterministic() {
        let a = RoomMetadata::for_room("newsroom");
        let b = RoomMetadata::for_room("newsroom");
        assert_eq!(a.id, b.id);
        assert_eq!(a.name, "newsroom");
    }
}
