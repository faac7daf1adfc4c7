//! Router actor implementation
//!
//! Maps room keys to running room actors, spawning a room on first use and
//! forgetting it once it stops. Holds no room state of its own.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::error::AppError;
use crate::message::RoomState;
use crate::room::{Room, RoomCommand, RoomEnvelope};
use crate::types::RoomId;

/// Default timeout for snapshot queries
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(1);

/// Commands sent to the Router actor
#[derive(Debug)]
pub enum RouterCommand {
    /// Deliver a command to the room for `key`
    Dispatch { key: String, command: RoomCommand },
    /// A room task has stopped
    RoomStopped {
        room_id: RoomId,
        generation: u64,
        /// Commands that were queued in the room when it stopped
        pending: Vec<RoomEnvelope>,
    },
}

/// A registered room
struct RoomEntry {
    generation: u64,
    sender: mpsc::UnboundedSender<RoomEnvelope>,
    /// Set once the room refused a command; it is stopping
    stopping: bool,
    /// Commands held back until the stopping room hands back its queue
    stash: Vec<RoomEnvelope>,
}

/// The Router actor
///
/// Processes commands sequentially, so lookup-or-create and deregistration
/// never race with each other.
pub struct Router {
    /// Live rooms: RoomId -> RoomEntry
    rooms: HashMap<RoomId, RoomEntry>,
    /// Counter distinguishing successive instances of the same room id
    next_generation: u64,
    /// Own command sender, handed to room tasks for the stop notification
    sender: mpsc::UnboundedSender<RouterCommand>,
    /// Command receiver channel
    receiver: mpsc::UnboundedReceiver<RouterCommand>,
}

impl Router {
    /// Create a Router; `sender` must feed `receiver`
    pub fn new(
        sender: mpsc::UnboundedSender<RouterCommand>,
        receiver: mpsc::UnboundedReceiver<RouterCommand>,
    ) -> Self {
        Self {
            rooms: HashMap::new(),
            next_generation: 0,
            sender,
            receiver,
        }
    }

    /// Spawn a Router task and return a handle to it
    pub fn start(query_timeout: Duration) -> RouterHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let router = Self::new(tx.clone(), rx);
        tokio::spawn(router.run());
        RouterHandle::new(tx, query_timeout)
    }

    /// Run the Router event loop
    pub async fn run(mut self) {
        info!("Router started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RouterCommand::Dispatch { key, command } => {
                    self.dispatch(RoomEnvelope { key, command })
                }
                RouterCommand::RoomStopped {
                    room_id,
                    generation,
                    pending,
                } => self.handle_room_stopped(room_id, generation, pending),
            }
        }

        info!("Router shutting down");
    }

    /// Deliver a command, creating the room if needed
    fn dispatch(&mut self, envelope: RoomEnvelope) {
        let room_id = RoomId::from_key(&envelope.key);

        if let Some(entry) = self.rooms.get_mut(&room_id) {
            if entry.stopping {
                entry.stash.push(envelope);
                return;
            }
            match entry.sender.send(envelope) {
                Ok(()) => return,
                Err(mpsc::error::SendError(envelope)) => {
                    debug!("Room {} is stopping, holding command", room_id);
                    entry.stopping = true;
                    entry.stash.push(envelope);
                    return;
                }
            }
        }

        let sender = self.spawn_room(room_id.clone(), envelope.key.clone());
        if sender.send(envelope).is_err() {
            error!("Room {} stopped before its first command", room_id);
        }
    }

    fn spawn_room(&mut self, room_id: RoomId, key: String) -> mpsc::UnboundedSender<RoomEnvelope> {
        let generation = self.next_generation;
        self.next_generation += 1;

        let (tx, rx) = mpsc::unbounded_channel();
        let room = Room::new(key);
        let router = self.sender.clone();
        let task_room_id = room_id.clone();
        tokio::spawn(async move {
            let pending = room.run(rx).await;
            let _ = router.send(RouterCommand::RoomStopped {
                room_id: task_room_id,
                generation,
                pending,
            });
        });

        self.rooms.insert(
            room_id.clone(),
            RoomEntry {
                generation,
                sender: tx.clone(),
                stopping: false,
                stash: Vec::new(),
            },
        );
        debug!("Room {} created (total rooms: {})", room_id, self.rooms.len());

        tx
    }

    /// Forget a stopped room and re-dispatch whatever it left behind
    fn handle_room_stopped(
        &mut self,
        room_id: RoomId,
        generation: u64,
        pending: Vec<RoomEnvelope>,
    ) {
        let Some(entry) = self.rooms.remove(&room_id) else {
            error!("Unknown room {} reported stop", room_id);
            return;
        };
        if entry.generation != generation {
            error!(
                "Stale stop for room {} (generation {}, live {})",
                room_id, generation, entry.generation
            );
            self.rooms.insert(room_id, entry);
            return;
        }

        debug!("Room {} removed (total rooms: {})", room_id, self.rooms.len());

        for envelope in pending.into_iter().chain(entry.stash) {
            self.dispatch(envelope);
        }
    }
}

/// Cloneable handle for talking to the Router
#[derive(Debug, Clone)]
pub struct RouterHandle {
    sender: mpsc::UnboundedSender<RouterCommand>,
    query_timeout: Duration,
}

impl RouterHandle {
    pub fn new(sender: mpsc::UnboundedSender<RouterCommand>, query_timeout: Duration) -> Self {
        Self {
            sender,
            query_timeout,
        }
    }

    /// Send a command to the room for `key` without waiting
    pub fn dispatch(&self, key: &str, command: RoomCommand) {
        let cmd = RouterCommand::Dispatch {
            key: key.to_string(),
            command,
        };
        if self.sender.send(cmd).is_err() {
            error!("Router is gone, dropping command for room '{}'", key);
        }
    }

    /// Query the current state of the room for `key`
    ///
    /// Creates the room if it does not exist yet. Fails with
    /// [`AppError::QueryTimeout`] if no reply arrives in time.
    pub async fn room_state(&self, key: &str) -> Result<RoomState, AppError> {
        let (reply, response) = oneshot::channel();
        self.dispatch(key, RoomCommand::GetRoomState { reply });

        match tokio::time::timeout(self.query_timeout, response).await {
            Ok(Ok(state)) => Ok(state),
            Ok(Err(_)) => Err(AppError::RoomUnavailable(key.to_string())),
            Err(_) => Err(AppError::QueryTimeout(self.query_timeout)),
        }
    }
}
