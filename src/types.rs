//! Basic type definitions for the speaker queue
//!
//! Provides newtype wrappers for type safety:
//! - `ParticipantId`: UUID-based unique participant identifier
//! - `RoomId`: sanitized internal identifier derived from a room key

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique participant identifier (newtype pattern)
///
/// Wraps a UUID v4. Serialized as the plain hyphenated string so it can be
/// used directly as `participantId` and inside `raisedHands` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    /// Create a new random participant ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Internal room identifier
///
/// Derived from the externally supplied room key by keeping only ASCII
/// alphanumerics, `_` and `-`. Two keys that reduce to the same id address
/// the same room instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomId(pub String);

impl RoomId {
    /// Derive the room id for a raw room key
    pub fn from_key(key: &str) -> Self {
        Self(
            key.chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
                .collect(),
        )
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_id_unique() {
        let id1 = ParticipantId::new();
        let id2 = ParticipantId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_participant_id_serializes_as_string() {
        let id = ParticipantId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }

    #[test]
    fn test_room_id_keeps_word_characters() {
        assert_eq!(RoomId::from_key("team-standup_2").0, "team-standup_2");
    }

    #[test]
    fn test_room_id_strips_other_characters() {
        assert_eq!(RoomId::from_key("my room/#1!").0, "myroom1");
        assert_eq!(RoomId::from_key("café").0, "caf");
    }

    #[test]
    fn test_room_id_collision() {
        assert_eq!(RoomId::from_key("room!1"), RoomId::from_key("room?1"));
        assert_eq!(RoomId::from_key("room!1").0, "room1");
    }
}
