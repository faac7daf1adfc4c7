//! Participant definition
//!
//! A participant is first `Initializing` (connected, no name yet) and becomes
//! `Ready` once a display name is set. Both phases receive broadcasts; only
//! `Ready` participants are listed in snapshots.

use crate::message::{RoomParticipant, ServerMessage};
use crate::outbox::OutboxSender;
use crate::types::ParticipantId;

/// Participant in a room
#[derive(Debug, Clone)]
pub enum Participant {
    /// Connected, name not set yet
    Initializing {
        id: ParticipantId,
        outbox: OutboxSender,
    },
    /// Named participant
    Ready {
        id: ParticipantId,
        outbox: OutboxSender,
        name: String,
    },
}

impl Participant {
    /// Create a participant that has not set a name yet
    pub fn new(id: ParticipantId, outbox: OutboxSender) -> Self {
        Self::Initializing { id, outbox }
    }

    pub fn id(&self) -> ParticipantId {
        match self {
            Self::Initializing { id, .. } | Self::Ready { id, .. } => *id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Initializing { .. } => None,
            Self::Ready { name, .. } => Some(name),
        }
    }

    /// Set the display name, keeping the same outbox
    ///
    /// Moves an `Initializing` participant to `Ready`; a `Ready` participant
    /// just gets the new name.
    pub fn set_name(&mut self, name: String) {
        let (id, outbox) = match self {
            Self::Initializing { id, outbox } | Self::Ready { id, outbox, .. } => {
                (*id, outbox.clone())
            }
        };
        *self = Self::Ready { id, outbox, name };
    }

    /// Queue a message for this participant
    pub fn send(&self, msg: ServerMessage) {
        match self {
            Self::Initializing { outbox, .. } | Self::Ready { outbox, .. } => outbox.deliver(msg),
        }
    }

    /// Snapshot entry, `None` while the participant is still initializing
    pub fn as_room_participant(&self) -> Option<RoomParticipant> {
        match self {
            Self::Initializing { .. } => None,
            Self::Ready { id, name, .. } => Some(RoomParticipant {
                id: *id,
                name: name.clone(),
            }),
        }
    }
}
