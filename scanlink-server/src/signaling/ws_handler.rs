use crate::http::AppState;
use crate::relay::{RelayCommand, command_for};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use scanlink_core::{ClientSignal, ConnectionId, Role, ServerSignal};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Handshake metadata clients tack onto the upgrade URL. Diagnostic only;
/// it never gates the join.
#[derive(Debug, Default, Deserialize)]
pub struct HandshakeMeta {
    pub client: Option<String>,
    pub role: Option<Role>,
    pub timestamp: Option<i64>,
    pub attempt: Option<u32>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(meta): Query<HandshakeMeta>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let connection_id = ConnectionId::new();
    info!(
        %connection_id,
        client = meta.client.as_deref().unwrap_or("unknown"),
        role = ?meta.role,
        attempt = meta.attempt.unwrap_or(0),
        "websocket upgrade"
    );

    ws.on_upgrade(move |socket| handle_socket(socket, connection_id, state))
}

async fn handle_socket(socket: WebSocket, connection_id: ConnectionId, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    state.signaling.add_peer(connection_id.clone(), tx);
    state
        .signaling
        .send_signal(&connection_id, &ServerSignal::Welcome {
            connection_id: connection_id.clone(),
        });

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let relay = state.relay.clone();
        let connection_id = connection_id.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientSignal>(&text) {
                        Ok(signal) => {
                            relay
                                .send(command_for(connection_id.clone(), signal))
                                .await;
                        }
                        Err(e) => warn!(%connection_id, "invalid signal dropped: {e}"),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }

            relay
                .send(RelayCommand::Disconnect {
                    from: connection_id.clone(),
                })
                .await;
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    state.signaling.remove_peer(&connection_id);
    info!(%connection_id, "websocket disconnected");
}
