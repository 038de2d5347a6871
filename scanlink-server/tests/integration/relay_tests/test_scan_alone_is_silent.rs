use scanlink_core::{ConnectionId, Role, ScanType, ServerSignal};
use scanlink_server::RelayCommand;

use crate::integration::{create_test_relay, init_tracing, join, settle};

/// A scan sent into a room with nobody else in it relays to no one, raises
/// no error, and leaves the connection fully usable.
#[tokio::test]
async fn test_scan_alone_is_silent() {
    init_tracing();

    let (relay, sink, _signal_rx) = create_test_relay();
    let alice = ConnectionId::new();

    join(&relay, &alice, "R1", "Alice", Role::Host).await;

    relay
        .send(RelayCommand::ScanNotification {
            from: alice.clone(),
            room: "R1".to_string(),
            scan_type: Some(ScanType::FaceScan),
            message: Some("scanning".to_string()),
            duration_ms: Some(3000),
        })
        .await;
    settle(&relay).await;

    assert!(
        !sink
            .all()
            .await
            .iter()
            .any(|(_, s)| matches!(s, ServerSignal::ScanNotification { .. }))
    );

    // the connection still works: a heartbeat is acknowledged
    relay
        .send(RelayCommand::Heartbeat {
            from: alice.clone(),
            timestamp: 42,
        })
        .await;
    settle(&relay).await;

    assert!(
        sink.signals_for(&alice)
            .await
            .iter()
            .any(|s| matches!(s, ServerSignal::HeartbeatAck { timestamp: 42, .. }))
    );
}
