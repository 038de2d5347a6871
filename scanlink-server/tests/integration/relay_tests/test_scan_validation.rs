use scanlink_core::{ConnectionId, Role, ScanType, ServerSignal};
use scanlink_server::RelayCommand;

use crate::integration::{create_test_relay, init_tracing, join, recv_signal, settle};

/// Incomplete scan payloads are dropped silently and never forwarded; valid
/// ones keep flowing right after.
#[tokio::test]
async fn test_scan_validation() {
    init_tracing();

    let (relay, sink, mut signal_rx) = create_test_relay();
    let alice = ConnectionId::new();
    let bob = ConnectionId::new();

    join(&relay, &alice, "R1", "Alice", Role::Host).await;
    join(&relay, &bob, "R1", "Bob", Role::Guest).await;
    while signal_rx.try_recv().is_ok() {} // drain the join broadcasts

    // missing message
    relay
        .send(RelayCommand::ScanNotification {
            from: alice.clone(),
            room: "R1".to_string(),
            scan_type: Some(ScanType::FaceScan),
            message: None,
            duration_ms: None,
        })
        .await;
    // missing type
    relay
        .send(RelayCommand::ScanNotification {
            from: alice.clone(),
            room: "R1".to_string(),
            scan_type: None,
            message: Some("scanning".to_string()),
            duration_ms: None,
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

    // a complete payload right after still goes through
    relay
        .send(RelayCommand::ScanNotification {
            from: alice.clone(),
            room: "R1".to_string(),
            scan_type: Some(ScanType::HandScan),
            message: Some("hold still".to_string()),
            duration_ms: None,
        })
        .await;

    let (to, signal) = recv_signal(&mut signal_rx).await;
    assert_eq!(to, bob);
    match signal {
        ServerSignal::ScanNotification {
            scan_type,
            message,
            duration_ms,
            from,
            from_name,
            timestamp,
        } => {
            assert_eq!(scan_type, ScanType::HandScan);
            assert_eq!(message, "hold still");
            assert_eq!(duration_ms, 5000);
            assert_eq!(from, alice);
            assert_eq!(from_name, "Alice");
            assert!(timestamp > 0);
        }
        other => panic!("expected scan notification, got {other:?}"),
    }
}
