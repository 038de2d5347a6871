pub mod membership_tests;
pub mod relay_tests;
pub mod sweep_tests;

use scanlink_core::{ConnectionId, Role, ServerSignal};
use scanlink_server::{RelayCommand, RelayHandle, ServerConfig, spawn_relay};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::Level;

use crate::utils::MockSink;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub type SignalRx = mpsc::UnboundedReceiver<(ConnectionId, ServerSignal)>;

pub fn create_test_relay() -> (RelayHandle, MockSink, SignalRx) {
    create_test_relay_with(ServerConfig::default())
}

pub fn create_test_relay_with(config: ServerConfig) -> (RelayHandle, MockSink, SignalRx) {
    let (sink, signal_rx) = MockSink::new();
    let relay = spawn_relay(config, Arc::new(sink.clone()));
    (relay, sink, signal_rx)
}

/// Joins a connection and waits until the relay has processed the command.
pub async fn join(relay: &RelayHandle, from: &ConnectionId, room: &str, name: &str, role: Role) {
    relay
        .send(RelayCommand::Join {
            from: from.clone(),
            room: room.to_string(),
            user_name: name.to_string(),
            role,
        })
        .await;
    settle(relay).await;
}

/// Barrier: the relay processes commands strictly in order, so once a
/// snapshot reply comes back every previously sent command has landed.
pub async fn settle(relay: &RelayHandle) {
    relay.snapshot().await.expect("relay task is gone");
}

pub async fn recv_signal(rx: &mut SignalRx) -> (ConnectionId, ServerSignal) {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a signal")
        .expect("sink channel closed")
}
