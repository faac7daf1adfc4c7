//! Bounded outbound queue for one connection
//!
//! Built on a single-subscriber `tokio::sync::broadcast` channel: sending never
//! blocks and never waits for the reader, and once the buffer is full the
//! oldest queued message is overwritten. A reader that falls behind skips
//! ahead to what is still buffered.

use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::message::ServerMessage;

/// Outbound buffer capacity per connection
pub const OUTBOX_CAPACITY: usize = 1024;

/// Create a connected outbox pair with the default capacity
pub fn outbox() -> (OutboxSender, OutboxReceiver) {
    outbox_with_capacity(OUTBOX_CAPACITY)
}

/// Create a connected outbox pair holding at most `capacity` messages
pub fn outbox_with_capacity(capacity: usize) -> (OutboxSender, OutboxReceiver) {
    let (tx, rx) = broadcast::channel(capacity);
    (OutboxSender(tx), OutboxReceiver(rx))
}

/// Room-side delivery handle
#[derive(Debug, Clone)]
pub struct OutboxSender(broadcast::Sender<ServerMessage>);

impl OutboxSender {
    /// Queue a message without waiting
    ///
    /// A closed receiver (connection already gone) is not an error.
    pub fn deliver(&self, msg: ServerMessage) {
        if self.0.send(msg).is_err() {
            trace!("Outbox receiver closed, message discarded");
        }
    }
}

/// Connection-side end of the outbox
#[derive(Debug)]
pub struct OutboxReceiver(broadcast::Receiver<ServerMessage>);

impl OutboxReceiver {
    /// Receive the next message
    ///
    /// Returns `None` once every sender is dropped and the buffer is drained.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        loop {
            match self.0.recv().await {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Slow consumer, dropped {} oldest messages", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
