use crate::signaling::SignalingSink;
use async_trait::async_trait;
use axum::extract::ws::Message;
use dashmap::DashMap;
use scanlink_core::{ConnectionId, ServerSignal};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, warn};

struct ServiceInner {
    peers: DashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
}

/// Registry of live WebSocket connections. Delivery is a channel push into
/// the connection's send task, never awaited network I/O.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<ServiceInner>,
}

impl SignalingService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                peers: DashMap::new(),
            }),
        }
    }

    pub fn connection_count(&self) -> usize {
        self.inner.peers.len()
    }

    pub fn add_peer(&self, connection_id: ConnectionId, tx: mpsc::UnboundedSender<Message>) {
        self.inner.peers.insert(connection_id, tx);
    }

    pub fn remove_peer(&self, connection_id: &ConnectionId) {
        self.inner.peers.remove(connection_id);
    }

    pub fn send_signal(&self, connection_id: &ConnectionId, signal: &ServerSignal) {
        let Some(peer) = self.inner.peers.get(connection_id) else {
            warn!(%connection_id, "attempted to send signal to disconnected user");
            return;
        };
        match serde_json::to_string(signal) {
            Ok(json) => {
                if let Err(e) = peer.send(Message::Text(json.into())) {
                    error!(%connection_id, "failed to queue signal: {e}");
                }
            }
            Err(e) => error!("failed to serialize signal: {e}"),
        }
    }
}

impl Default for SignalingService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalingSink for SignalingService {
    async fn deliver(&self, to: ConnectionId, signal: ServerSignal) {
        self.send_signal(&to, &signal);
    }
}
