//! Message protocol definitions
//!
//! JSON-based bidirectional message protocol using Serde's tagged enum
//! for type-safe serialization/deserialization. The `type` discriminator
//! uses SCREAMING_SNAKE_CASE on the wire (`SET_NAME`, `ROOM_STATE_UPDATED`).

use serde::{Deserialize, Serialize};

use crate::types::ParticipantId;

/// Client → Room message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Set (or change) the display name
    SetName { name: String },
    /// Ask to speak
    RaiseHand,
    /// Withdraw the request to speak
    LowerHand,
}

/// Room → Client message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Sent once, only to the participant that just joined
    Joined {
        #[serde(rename = "participantId")]
        participant_id: ParticipantId,
    },
    /// Sent to every participant whenever the room changes
    RoomStateUpdated { room: RoomState },
}

/// Snapshot of a room
///
/// Lists named participants in join order and the raised hands in the order
/// they were raised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomState {
    pub participants: Vec<RoomParticipant>,
    pub raised_hands: Vec<ParticipantId>,
}

impl RoomState {
    /// Number of raised hands (the plain-text representation of a snapshot)
    pub fn raised_hand_count(&self) -> usize {
        self.raised_hands.len()
    }
}

/// A named participant as it appears in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomParticipant {
    pub id: ParticipantId,
    pub name: String,
}
