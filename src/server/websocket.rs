//! WebSocket live notification feed.
//!
//! Handles the upgrade, pipes snapshot deliveries from the user's feed into
//! the socket, and answers ping messages. Every delivery is the full current
//! list; clients replace their state instead of patching it.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::notifications::Notification;

use super::identity::Identity;
use super::state::GuardedNotificationService;

/// Server -> Client message envelope. The `type` field routes the payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub payload: serde_json::Value,
}

impl ServerMessage {
    pub fn new(msg_type: impl Into<String>, payload: impl Serialize) -> Self {
        Self {
            msg_type: msg_type.into(),
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn empty(msg_type: impl Into<String>) -> Self {
        Self {
            msg_type: msg_type.into(),
            payload: serde_json::Value::Null,
        }
    }
}

/// Client -> Server message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

pub mod msg_types {
    /// Sent by server on successful connection.
    pub const CONNECTED: &str = "connected";
    /// Full notification snapshot (server -> client).
    pub const NOTIFICATIONS: &str = "notifications";
    /// Client heartbeat request.
    pub const PING: &str = "ping";
    /// Server heartbeat response.
    pub const PONG: &str = "pong";
    /// Server error response.
    pub const ERROR: &str = "error";
}

/// Payload of the `connected` message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Connected {
    pub user_id: String,
    pub server_version: String,
}

/// Payload of a `notifications` message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationsMessage {
    pub notifications: Vec<Notification>,
    pub unread: usize,
}

/// Payload of an `error` message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WsError {
    pub code: String,
    pub message: String,
}

/// Route handler for `GET /v1/ws`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    identity: Identity,
    State(service): State<GuardedNotificationService>,
) -> Response {
    debug!("WebSocket upgrade for user {}", identity.user_id);
    ws.on_upgrade(move |socket| handle_socket(socket, identity.user_id, service))
}

async fn handle_socket(socket: WebSocket, user_id: String, service: GuardedNotificationService) {
    debug!("WebSocket connected: user {}", user_id);

    let mut feed = service.subscribe(&user_id).await;
    let (ws_sink, ws_stream) = socket.split();
    let (out_tx, out_rx) = mpsc::channel::<ServerMessage>(32);

    let connected_msg = ServerMessage::new(
        msg_types::CONNECTED,
        Connected {
            user_id: user_id.clone(),
            server_version: env!("GIT_HASH").to_string(),
        },
    );

    // Pipe feed deliveries into the outgoing channel. The task owns the
    // feed, so aborting it drops the feed and the subscription gets pruned.
    let feed_tx = out_tx.clone();
    let feed_handle = tokio::spawn(async move {
        while let Some(snapshot) = feed.recv().await {
            let unread = snapshot.iter().filter(|n| !n.is_read()).count();
            let msg = ServerMessage::new(
                msg_types::NOTIFICATIONS,
                NotificationsMessage {
                    notifications: snapshot,
                    unread,
                },
            );
            if feed_tx.send(msg).await.is_err() {
                break;
            }
        }
    });

    let outgoing_handle = tokio::spawn(forward_outgoing(ws_sink, out_rx, connected_msg));

    process_incoming(ws_stream, &out_tx).await;

    debug!("WebSocket disconnected: user {}", user_id);
    feed_handle.abort();
    outgoing_handle.abort();
}

/// Forward messages from the outgoing channel to the WebSocket.
async fn forward_outgoing(
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut outgoing_rx: mpsc::Receiver<ServerMessage>,
    initial_msg: ServerMessage,
) {
    if let Ok(json) = serde_json::to_string(&initial_msg) {
        if ws_sink.send(Message::Text(json.into())).await.is_err() {
            return;
        }
    }

    while let Some(msg) = outgoing_rx.recv().await {
        match serde_json::to_string(&msg) {
            Ok(json) => {
                if ws_sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                error!("Failed to serialize WebSocket message: {}", e);
            }
        }
    }
}

/// Process incoming messages until the socket closes.
async fn process_incoming(
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    out_tx: &mpsc::Sender<ServerMessage>,
) {
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => handle_client_message(msg, out_tx).await,
                Err(e) => {
                    debug!("Failed to parse client message: {}", e);
                    let error_msg = ServerMessage::new(
                        msg_types::ERROR,
                        WsError {
                            code: "parse_error".to_string(),
                            message: format!("Invalid message format: {}", e),
                        },
                    );
                    let _ = out_tx.send(error_msg).await;
                }
            },
            Ok(Message::Binary(_)) => {
                debug!("Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                debug!("Received close frame");
                break;
            }
            Err(e) => {
                debug!("WebSocket error: {}", e);
                break;
            }
        }
    }
}

async fn handle_client_message(msg: ClientMessage, out_tx: &mpsc::Sender<ServerMessage>) {
    match msg.msg_type.as_str() {
        msg_types::PING => {
            let _ = out_tx.send(ServerMessage::empty(msg_types::PONG)).await;
        }
        other => {
            debug!("Unknown message type: {}", other);
            let error_msg = ServerMessage::new(
                msg_types::ERROR,
                WsError {
                    code: "unknown_type".to_string(),
                    message: format!("Unknown message type: {}", other),
                },
            );
            let _ = out_tx.send(error_msg).await;
        }
    }
}
