//! Speaker queue server library
//!
//! Participants join a named room over a WebSocket, set a display name and
//! raise or lower their hand to ask to speak. Everyone in the room receives
//! the membership and the raised-hand queue whenever it changes.
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Router` maps room keys to room actors, creating them on first use
//! - each `Room` is its own task and the only owner of its state
//! - each connection runs a `handler` pump talking to the Router
//! - outbound messages go through a bounded drop-oldest `outbox`
//!
//! # Example
//! ```ignore
//! use speakerq::{serve, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), speakerq::AppError> {
//!     let config = Config::from_env()?;
//!     serve(&config).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod outbox;
pub mod participant;
pub mod room;
pub mod router;
pub mod types;

// Re-export main types for convenience
pub use config::Config;
pub use error::AppError;
pub use handler::{handle_connection, run_connection, serve};
pub use message::{ClientMessage, RoomParticipant, RoomState, ServerMessage};
pub use outbox::{OutboxReceiver, OutboxSender, OUTBOX_CAPACITY};
pub use participant::Participant;
pub use room::{Room, RoomCommand, RoomEnvelope, RoomStatus};
pub use router::{Router, RouterCommand, RouterHandle, DEFAULT_QUERY_TIMEOUT};
pub use types::{ParticipantId, RoomId};
