//! WebSocket handler for mentor chat

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::ApiState;
use crate::chat::{ChatSession, WsOutgoing};

/// Outbound events buffered per connection
const SESSION_QUEUE: usize = 32;

/// Build WebSocket router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .with_state(state)
}

/// Handle WebSocket upgrade request
async fn ws_upgrade(
    State(state): State<Arc<ApiState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<ApiState>) {
    let (mut sender, mut receiver) = socket.split();
    let session_id = Uuid::new_v4();

    // Create channel for sending messages back to client
    let (tx, mut rx) = mpsc::channel::<WsOutgoing>(SESSION_QUEUE);

    state.registry.register(session_id, tx.clone()).await;
    tracing::info!(session_id = %session_id, "WebSocket connected");

    // Spawn task to forward messages from channel to WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    let mut session = ChatSession::new(session_id, state.chat.clone(), tx);

    // Handle incoming messages
    let mut recv_task = tokio::spawn(async move {
        if session.on_connect().await.is_err() {
            return;
        }

        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    if let Err(e) = session.handle_frame(text.as_str()).await {
                        tracing::debug!(session_id = %session.id(), error = %e, "session ended");
                        break;
                    }
                }
                Message::Binary(_) => {
                    if let Err(e) = session.handle_binary().await {
                        tracing::debug!(session_id = %session.id(), error = %e, "session ended");
                        break;
                    }
                }
                Message::Ping(data) => {
                    // axum answers pings itself
                    tracing::trace!(len = data.len(), "received ping");
                }
                Message::Close(_) => {
                    tracing::info!(session_id = %session.id(), "WebSocket closed by client");
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.registry.unregister(session_id).await;
    tracing::info!(session_id = %session_id, "WebSocket disconnected");
}
