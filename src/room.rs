//! Room actor
//!
//! One room is one task draining its own mailbox, so every mutation of the
//! participant list and the raised-hand queue happens sequentially without
//! locks. A room stops as soon as it has no participants left.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::message::{ClientMessage, RoomState, ServerMessage};
use crate::outbox::OutboxSender;
use crate::participant::Participant;
use crate::types::ParticipantId;

/// Commands processed by a room
#[derive(Debug)]
pub enum RoomCommand {
    /// A connection was established for this room
    ParticipantJoined {
        participant_id: ParticipantId,
        outbox: OutboxSender,
    },
    /// A connection ended
    ParticipantLeft { participant_id: ParticipantId },
    /// A decoded client message
    ParticipantMessage {
        participant_id: ParticipantId,
        message: ClientMessage,
    },
    /// Snapshot query
    GetRoomState { reply: oneshot::Sender<RoomState> },
}

/// A command together with the room key it was dispatched under
///
/// Colliding keys share a room, so the key a command arrived with may differ
/// from the key the room was created with.
#[derive(Debug)]
pub struct RoomEnvelope {
    pub key: String,
    pub command: RoomCommand,
}

/// Outcome of processing one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Active,
    Terminated,
}

/// State of a single room
#[derive(Debug)]
pub struct Room {
    /// Room key as supplied by the first caller
    key: String,
    /// Participants in join order
    participants: Vec<Participant>,
    /// Raised hands in the order they were raised
    raised_hands: Vec<ParticipantId>,
}

impl Room {
    /// Create an empty room for the given key
    pub fn new(key: String) -> Self {
        Self {
            key,
            participants: Vec::new(),
            raised_hands: Vec::new(),
        }
    }

    /// Run the room until it becomes empty
    ///
    /// On termination the mailbox is closed and drained; envelopes that were
    /// already queued are returned so the caller can hand them to a fresh
    /// instance.
    pub async fn run(
        mut self,
        mut receiver: mpsc::UnboundedReceiver<RoomEnvelope>,
    ) -> Vec<RoomEnvelope> {
        info!("Room '{}' started", self.key);

        while let Some(envelope) = receiver.recv().await {
            if envelope.key != self.key {
                debug!("Key '{}' routed to room '{}'", envelope.key, self.key);
            }
            if self.handle_command(envelope.command) == RoomStatus::Terminated {
                break;
            }
        }

        receiver.close();
        let mut pending = Vec::new();
        while let Some(envelope) = receiver.recv().await {
            pending.push(envelope);
        }

        info!(
            "Room '{}' stopped ({} queued commands handed back)",
            self.key,
            pending.len()
        );
        pending
    }

    /// Process a single command
    ///
    /// The room is terminated once no participant is left after the command.
    pub fn handle_command(&mut self, cmd: RoomCommand) -> RoomStatus {
        match cmd {
            RoomCommand::ParticipantJoined {
                participant_id,
                outbox,
            } => self.handle_joined(participant_id, outbox),
            RoomCommand::ParticipantLeft { participant_id } => self.handle_left(participant_id),
            RoomCommand::ParticipantMessage {
                participant_id,
                message,
            } => self.handle_message(participant_id, message),
            RoomCommand::GetRoomState { reply } => {
                if reply.send(self.snapshot()).is_err() {
                    debug!("Room '{}' state requested but requester is gone", self.key);
                }
            }
        }

        if self.participants.is_empty() {
            RoomStatus::Terminated
        } else {
            RoomStatus::Active
        }
    }

    /// Build the current snapshot
    pub fn snapshot(&self) -> RoomState {
        RoomState {
            participants: self
                .participants
                .iter()
                .filter_map(Participant::as_room_participant)
                .collect(),
            raised_hands: self.raised_hands.clone(),
        }
    }

    fn handle_joined(&mut self, participant_id: ParticipantId, outbox: OutboxSender) {
        info!("Participant {} joined room '{}'", participant_id, self.key);

        let participant = Participant::new(participant_id, outbox);
        participant.send(ServerMessage::Joined { participant_id });

        match self.find_mut(participant_id) {
            Some(existing) => *existing = participant,
            None => self.participants.push(participant),
        }

        self.broadcast_state();
    }

    fn handle_left(&mut self, participant_id: ParticipantId) {
        info!("Participant {} left room '{}'", participant_id, self.key);

        self.participants.retain(|p| p.id() != participant_id);
        self.raised_hands.retain(|id| *id != participant_id);

        if !self.participants.is_empty() {
            self.broadcast_state();
        }
    }

    fn handle_message(&mut self, participant_id: ParticipantId, message: ClientMessage) {
        debug!(
            "Message from participant {} in room '{}': {:?}",
            participant_id, self.key, message
        );

        let Some(participant) = self.find_mut(participant_id) else {
            warn!(
                "Ignoring {:?} from unknown participant {} in room '{}'",
                message, participant_id, self.key
            );
            return;
        };

        match message {
            ClientMessage::SetName { name } => participant.set_name(name),
            ClientMessage::RaiseHand => {
                if !self.raised_hands.contains(&participant_id) {
                    self.raised_hands.push(participant_id);
                }
            }
            ClientMessage::LowerHand => {
                self.raised_hands.retain(|id| *id != participant_id);
            }
        }

        self.broadcast_state();
    }

    /// Send the current snapshot to every participant, named or not
    fn broadcast_state(&self) {
        let msg = ServerMessage::RoomStateUpdated {
            room: self.snapshot(),
        };
        for participant in &self.participants {
            participant.send(msg.clone());
        }
    }

    fn find_mut(&mut self, participant_id: ParticipantId) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.id() == participant_id)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::message::RoomParticipant;
    use crate::outbox::{outbox, OutboxReceiver};

    fn join(room: &mut Room) -> (ParticipantId, OutboxReceiver, RoomStatus) {
        let (tx, rx) = outbox();
        let id = ParticipantId::new();
        let status = room.handle_command(RoomCommand::ParticipantJoined {
            participant_id: id,
            outbox: tx,
        });
        (id, rx, status)
    }

    fn send(room: &mut Room, participant_id: ParticipantId, message: ClientMessage) -> RoomStatus {
        room.handle_command(RoomCommand::ParticipantMessage {
            participant_id,
            message,
        })
    }

    fn leave(room: &mut Room, participant_id: ParticipantId) -> RoomStatus {
        room.handle_command(RoomCommand::ParticipantLeft { participant_id })
    }

    async fn next_state(rx: &mut OutboxReceiver) -> RoomState {
        match rx.recv().await {
            Some(ServerMessage::RoomStateUpdated { room }) => room,
            other => panic!("Expected room state, got {:?}", other),
        }
    }

    async fn assert_no_message(rx: &mut OutboxReceiver) {
        let result = tokio::time::timeout(Duration::from_millis(20), rx.recv()).await;
        assert!(result.is_err(), "Unexpected message: {:?}", result);
    }

    fn alice(id: ParticipantId) -> RoomParticipant {
        RoomParticipant {
            id,
            name: "Alice".to_string(),
        }
    }

    #[tokio::test]
    async fn test_join_then_set_name() {
        let mut room = Room::new("demo".to_string());
        let (a, mut rx, status) = join(&mut room);
        assert_eq!(status, RoomStatus::Active);

        assert_eq!(
            rx.recv().await,
            Some(ServerMessage::Joined { participant_id: a })
        );
        assert_eq!(next_state(&mut rx).await, RoomState::default());

        send(&mut room, a, ClientMessage::SetName { name: "Alice".to_string() });
        let state = next_state(&mut rx).await;
        assert_eq!(state.participants, vec![alice(a)]);
        assert!(state.raised_hands.is_empty());
    }

    #[tokio::test]
    async fn test_joined_is_not_broadcast() {
        let mut room = Room::new("demo".to_string());
        let (_a, mut rx_a, _) = join(&mut room);
        rx_a.recv().await;
        next_state(&mut rx_a).await;

        let (_b, _rx_b, _) = join(&mut room);
        // A only sees the new state, not B's acknowledgement
        assert_eq!(next_state(&mut rx_a).await, RoomState::default());
        assert_no_message(&mut rx_a).await;
    }

    #[tokio::test]
    async fn test_unnamed_participant_sees_others() {
        let mut room = Room::new("demo".to_string());
        let (a, mut rx_a, _) = join(&mut room);
        send(&mut room, a, ClientMessage::SetName { name: "Alice".to_string() });

        let (_b, mut rx_b, _) = join(&mut room);
        rx_b.recv().await;
        assert_eq!(next_state(&mut rx_b).await.participants, vec![alice(a)]);

        rx_a.recv().await;
        assert!(next_state(&mut rx_a).await.participants.is_empty());
        assert_eq!(next_state(&mut rx_a).await.participants, vec![alice(a)]);
        assert_eq!(next_state(&mut rx_a).await.participants, vec![alice(a)]);
        assert_no_message(&mut rx_a).await;
    }

    #[test]
    fn test_raise_hand_order_and_leave() {
        let mut room = Room::new("demo".to_string());
        let (a, _rx_a, _) = join(&mut room);
        send(&mut room, a, ClientMessage::RaiseHand);
        let (b, _rx_b, _) = join(&mut room);
        send(&mut room, b, ClientMessage::RaiseHand);

        assert_eq!(room.snapshot().raised_hands, vec![a, b]);

        assert_eq!(leave(&mut room, a), RoomStatus::Active);
        assert_eq!(room.snapshot().raised_hands, vec![b]);
    }

    #[test]
    fn test_raise_hand_idempotent() {
        let mut room = Room::new("demo".to_string());
        let (a, _rx_a, _) = join(&mut room);
        let (b, _rx_b, _) = join(&mut room);
        send(&mut room, a, ClientMessage::RaiseHand);
        send(&mut room, b, ClientMessage::RaiseHand);
        send(&mut room, a, ClientMessage::RaiseHand);

        assert_eq!(room.snapshot().raised_hands, vec![a, b]);
    }

    #[test]
    fn test_lower_hand() {
        let mut room = Room::new("demo".to_string());
        let (a, _rx_a, _) = join(&mut room);
        let (b, _rx_b, _) = join(&mut room);

        // Not raised: no-op
        send(&mut room, a, ClientMessage::LowerHand);
        assert!(room.snapshot().raised_hands.is_empty());

        send(&mut room, a, ClientMessage::RaiseHand);
        send(&mut room, b, ClientMessage::RaiseHand);
        send(&mut room, a, ClientMessage::LowerHand);
        assert_eq!(room.snapshot().raised_hands, vec![b]);
    }

    #[tokio::test]
    async fn test_left_participant_absent_from_next_snapshot() {
        let mut room = Room::new("demo".to_string());
        let (a, _rx_a, _) = join(&mut room);
        send(&mut room, a, ClientMessage::SetName { name: "Alice".to_string() });
        send(&mut room, a, ClientMessage::RaiseHand);

        let (_b, mut rx_b, _) = join(&mut room);
        rx_b.recv().await;
        next_state(&mut rx_b).await;

        leave(&mut room, a);
        let state = next_state(&mut rx_b).await;
        assert!(state.participants.is_empty());
        assert!(state.raised_hands.is_empty());
    }

    #[test]
    fn test_terminates_only_when_empty() {
        let mut room = Room::new("demo".to_string());
        let (a, _rx_a, status) = join(&mut room);
        assert_eq!(status, RoomStatus::Active);
        let (b, _rx_b, status) = join(&mut room);
        assert_eq!(status, RoomStatus::Active);

        assert_eq!(leave(&mut room, a), RoomStatus::Active);
        // Leaving twice is harmless
        assert_eq!(leave(&mut room, a), RoomStatus::Active);
        assert_eq!(leave(&mut room, b), RoomStatus::Terminated);
    }

    #[tokio::test]
    async fn test_unknown_participant_ignored() {
        let mut room = Room::new("demo".to_string());
        let (a, mut rx_a, _) = join(&mut room);
        rx_a.recv().await;
        next_state(&mut rx_a).await;

        let stranger = ParticipantId::new();
        let status = send(&mut room, stranger, ClientMessage::SetName { name: "Eve".to_string() });
        assert_eq!(status, RoomStatus::Active);
        send(&mut room, stranger, ClientMessage::RaiseHand);

        assert_eq!(room.snapshot(), RoomState::default());
        assert_no_message(&mut rx_a).await;

        send(&mut room, a, ClientMessage::RaiseHand);
        assert_eq!(next_state(&mut rx_a).await.raised_hands, vec![a]);
    }

    #[test]
    fn test_stale_message_on_empty_room_terminates() {
        let mut room = Room::new("demo".to_string());
        let status = send(&mut room, ParticipantId::new(), ClientMessage::RaiseHand);
        assert_eq!(status, RoomStatus::Terminated);
    }

    #[tokio::test]
    async fn test_get_room_state() {
        let mut room = Room::new("demo".to_string());
        let (a, _rx_a, _) = join(&mut room);
        send(&mut room, a, ClientMessage::SetName { name: "Alice".to_string() });
        send(&mut room, a, ClientMessage::RaiseHand);

        let (reply, response) = oneshot::channel();
        let status = room.handle_command(RoomCommand::GetRoomState { reply });
        assert_eq!(status, RoomStatus::Active);

        let state = response.await.unwrap();
        assert_eq!(state.participants, vec![alice(a)]);
        assert_eq!(state.raised_hands, vec![a]);
    }

    #[tokio::test]
    async fn test_run_hands_back_queued_commands() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (outbox_tx, _outbox_rx) = outbox();
        let a = ParticipantId::new();
        let b = ParticipantId::new();
        let envelope = |key: &str, command| RoomEnvelope {
            key: key.to_string(),
            command,
        };

        tx.send(envelope(
            "demo",
            RoomCommand::ParticipantJoined {
                participant_id: a,
                outbox: outbox_tx,
            },
        ))
        .unwrap();
        tx.send(envelope("demo", RoomCommand::ParticipantLeft { participant_id: a }))
            .unwrap();
        tx.send(envelope("de!mo", RoomCommand::ParticipantLeft { participant_id: b }))
            .unwrap();

        let pending = Room::new("demo".to_string()).run(rx).await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].key, "de!mo");
        assert!(matches!(
            pending[0].command,
            RoomCommand::ParticipantLeft { participant_id } if participant_id == b
        ));

        // Mailbox is closed once the room has stopped
        assert!(tx
            .send(envelope("demo", RoomCommand::ParticipantLeft { participant_id: a }))
            .is_err());
    }
}
