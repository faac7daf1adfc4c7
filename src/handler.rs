//! WebSocket connection handler
//!
//! Handles individual participant connections: WebSocket handshake, frame
//! decoding, and bidirectional communication with the room through the
//! Router.

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::message::{ClientMessage, ServerMessage};
use crate::outbox::outbox;
use crate::room::RoomCommand;
use crate::router::{Router, RouterHandle};
use crate::types::ParticipantId;

/// Bind the listener and accept connections until the process stops
pub async fn serve(config: &Config) -> Result<(), AppError> {
    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Speaker queue listening on {}", listener.local_addr()?);

    let router = Router::start(config.query_timeout);

    // Connection accept loop
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!("New connection from {}", addr);
                let router = router.clone();

                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, router).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Extract the room key from a `/api/rooms/{key}/ws` request path
///
/// The key segment is percent-decoded; a segment that does not decode to
/// UTF-8 is used as is.
pub fn room_key_from_path(path: &str) -> Option<String> {
    let segment = path.strip_prefix("/api/rooms/")?.strip_suffix("/ws")?;
    if segment.is_empty() || segment.contains('/') {
        return None;
    }
    let key = urlencoding::decode(segment)
        .map(|key| key.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    Some(key)
}

/// Decode one text frame
pub fn decode_frame(text: &str) -> Result<ClientMessage, AppError> {
    Ok(serde_json::from_str(text)?)
}

/// Encode one outbound message as a text frame
pub fn encode_frame(msg: &ServerMessage) -> Result<Message, AppError> {
    Ok(Message::Text(serde_json::to_string(msg)?.into()))
}

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake and then pumps messages until the
/// connection ends. Requests for unknown paths get a 404; they and other
/// non-WebSocket requests are not treated as errors.
pub async fn handle_connection(stream: TcpStream, router: RouterHandle) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    let mut room_key = None;
    let handshake = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| {
        match room_key_from_path(req.uri().path()) {
            Some(key) => {
                room_key = Some(key);
                Ok(resp)
            }
            None => {
                let mut not_found = ErrorResponse::new(Some("Not Found".to_string()));
                *not_found.status_mut() = StatusCode::NOT_FOUND;
                Err(not_found)
            }
        }
    })
    .await;

    let ws_stream = match handshake {
        Ok(ws_stream) => ws_stream,
        Err(WsError::Http(response)) => {
            debug!("Rejected handshake from {}: {}", peer_addr, response.status());
            return Ok(());
        }
        Err(WsError::Protocol(e)) => {
            debug!("Non-WebSocket request from {}: {}", peer_addr, e);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let Some(room_key) = room_key else {
        return Ok(());
    };

    info!("Connection from {} for room '{}'", peer_addr, room_key);
    run_connection(ws_stream, room_key, router).await;

    Ok(())
}

/// Pump one established WebSocket connection
///
/// Registers a new participant with the room, forwards decoded client
/// messages and writes room broadcasts back as text frames. The participant
/// leaves exactly once, whichever side ends the connection.
pub async fn run_connection<S>(
    ws_stream: WebSocketStream<S>,
    room_key: String,
    router: RouterHandle,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let participant_id = ParticipantId::new();
    info!("Participant {} connected to room '{}'", participant_id, room_key);

    let (outbox_tx, mut outbox_rx) = outbox();
    router.dispatch(
        &room_key,
        RoomCommand::ParticipantJoined {
            participant_id,
            outbox: outbox_tx,
        },
    );

    // Read task (WebSocket -> Router)
    let read_router = router.clone();
    let read_key = room_key.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => match decode_frame(&text) {
                    Ok(message) => read_router.dispatch(
                        &read_key,
                        RoomCommand::ParticipantMessage {
                            participant_id,
                            message,
                        },
                    ),
                    Err(e) => {
                        warn!("Unable to parse message from {} ({}): {}", participant_id, text, e);
                    }
                },
                Ok(Message::Close(_)) => {
                    debug!("Participant {} sent close frame", participant_id);
                    break;
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Pong replies are handled by tungstenite
                }
                Ok(_) => {
                    warn!("Ignoring non-text message from {}", participant_id);
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", participant_id, e);
                    break;
                }
            }
        }
        debug!("Read task ended for {}", participant_id);
    });

    // Write task (Outbox -> WebSocket)
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = outbox_rx.recv().await {
            match encode_frame(&msg) {
                Ok(frame) => {
                    if ws_sender.send(frame).await.is_err() {
                        debug!("WebSocket send failed, ending write task");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to encode message: {}", e);
                }
            }
        }
        debug!("Write task ended for {}", participant_id);

        let _ = ws_sender.close().await;
    });

    // Wait for either task to complete, then stop the other
    tokio::select! {
        _ = &mut read_task => {
            debug!("Read task completed for {}", participant_id);
            write_task.abort();
        }
        _ = &mut write_task => {
            debug!("Write task completed for {}", participant_id);
            read_task.abort();
        }
    }

    router.dispatch(&room_key, RoomCommand::ParticipantLeft { participant_id });

    info!("Participant {} disconnected from room '{}'", participant_id, room_key);
}
