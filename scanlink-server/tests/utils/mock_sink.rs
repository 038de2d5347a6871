use async_trait::async_trait;
use scanlink_core::{ConnectionId, ServerSignal};
use scanlink_server::SignalingSink;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Mock SignalingSink that captures all outgoing signals.
#[derive(Clone)]
pub struct MockSink {
    /// Channel to stream captured signals.
    tx: mpsc::UnboundedSender<(ConnectionId, ServerSignal)>,
    /// All captured signals (for verification).
    delivered: Arc<Mutex<Vec<(ConnectionId, ServerSignal)>>>,
}

impl MockSink {
    /// Create a new MockSink and its receiver channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(ConnectionId, ServerSignal)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self {
            tx,
            delivered: Arc::new(Mutex::new(Vec::new())),
        };
        (sink, rx)
    }

    /// Everything delivered to a specific connection, in order.
    pub async fn signals_for(&self, connection_id: &ConnectionId) -> Vec<ServerSignal> {
        self.delivered
            .lock()
            .await
            .iter()
            .filter(|(to, _)| to == connection_id)
            .map(|(_, signal)| signal.clone())
            .collect()
    }

    pub async fn all(&self) -> Vec<(ConnectionId, ServerSignal)> {
        self.delivered.lock().await.clone()
    }
}

#[async_trait]
impl SignalingSink for MockSink {
    async fn deliver(&self, to: ConnectionId, signal: ServerSignal) {
        tracing::debug!("[MockSink] deliver to {to}: {signal:?}");
        self.delivered
            .lock()
            .await
            .push((to.clone(), signal.clone()));
        let _ = self.tx.send((to, signal));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanlink_core::Role;
    use scanlink_core::RoomStats;

    #[tokio::test]
    async fn mock_sink_captures_deliveries() {
        let (sink, mut rx) = MockSink::new();
        let conn = ConnectionId::new();
        let signal = ServerSignal::MembershipChanged {
            user_id: conn.clone(),
            user_name: "Alice".to_string(),
            role: Role::Host,
            participants: vec!["Alice".to_string()],
            participant_count: 1,
            room_stats: RoomStats {
                hosts: 1,
                guests: 0,
                total: 1,
            },
        };

        sink.deliver(conn.clone(), signal.clone()).await;

        let (to, received) = rx.recv().await.unwrap();
        assert_eq!(to, conn);
        assert_eq!(received, signal);
        assert_eq!(sink.signals_for(&conn).await, vec![signal]);
    }
}
