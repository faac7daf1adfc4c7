//! Error types for the speaker queue
//!
//! Defines application-level errors using thiserror. None of these are fatal
//! to a room: connection errors end one connection, query errors are returned
//! to the caller of the snapshot query.

use std::time::Duration;

use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (ends the connection)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot query did not complete in time
    #[error("Room state query timed out after {0:?}")]
    QueryTimeout(Duration),

    /// Snapshot query was dropped without a reply
    #[error("Room unavailable: {0}")]
    RoomUnavailable(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
