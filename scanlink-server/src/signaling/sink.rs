use async_trait::async_trait;
use scanlink_core::{ConnectionId, ServerSignal};

/// Outbound delivery seam between the relay and whatever carries signals to
/// clients. Production uses the WebSocket service; tests capture traffic.
#[async_trait]
pub trait SignalingSink: Send + Sync {
    async fn deliver(&self, to: ConnectionId, signal: ServerSignal);
}
