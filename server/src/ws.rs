use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use disaster_shared::protocol::ClientMsg;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use crate::broadcast::Broadcast;
use crate::gateway::ConnectionGateway;
use crate::world::WorldState;

/// Undecodable frames tolerated before the connection is dropped.
pub const MAX_PARSE_ERRORS: u32 = 5;

/// Shared app state passed to each handler
#[derive(Clone)]
pub struct AppState {
    pub world: Arc<WorldState>,
    pub gateway: Arc<ConnectionGateway>,
    pub broadcast_tx: broadcast::Sender<Broadcast>,
    pub max_message_bytes: usize,
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    ws.max_message_size(app_state.max_message_bytes)
        .on_upgrade(|socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let (mut sink, mut stream) = socket.split();

    let my_id = app_state.gateway.open_connection();
    let mut broadcast_rx = app_state.broadcast_tx.subscribe();
    let mut parse_errors = 0u32;

    tracing::info!("Connection {} opened", my_id);

    loop {
        tokio::select! {
            // Client -> Server
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMsg>(&text) {
                            Ok(ClientMsg::UpdateShape(shape)) => {
                                app_state.gateway.submit_shape_update(my_id, shape);
                            }
                            Ok(ClientMsg::UpdatePerson(person)) => {
                                app_state.gateway.submit_person_update(my_id, person);
                            }
                            Err(e) => {
                                parse_errors += 1;
                                tracing::debug!("Connection {} sent bad frame: {}", my_id, e);
                                if parse_errors > MAX_PARSE_ERRORS {
                                    tracing::warn!("Connection {} dropped after {} bad frames", my_id, parse_errors);
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::warn!("Connection {} read error: {}", my_id, e);
                        break;
                    }
                    _ => {} // Ignore ping/pong/binary
                }
            }

            // Server -> Client (broadcast)
            result = broadcast_rx.recv() => {
                match result {
                    Ok(broadcast) => {
                        if !broadcast.recipients.includes(my_id) {
                            continue; // Own echo
                        }
                        if let Ok(json) = serde_json::to_string(&broadcast.msg) {
                            if sink.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("Connection {} lagged by {} messages", my_id, n);
                        // Continue - every message is a full latest value, dropping is fine
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::info!("Connection {} closed", my_id);
}
