use scanlink_core::{ConnectionId, Role, ServerSignal, epoch_millis};
use scanlink_server::{RelayCommand, ServerConfig};
use std::time::Duration;

use crate::integration::{create_test_relay_with, init_tracing, join, settle};

/// A participant that stops heartbeating is treated as abandoned by the
/// periodic sweep, while one that keeps heartbeating survives. Uses
/// millisecond-scale thresholds so the test runs in real time.
#[tokio::test]
async fn test_stale_participants_purged() {
    init_tracing();

    let config = ServerConfig {
        sweep_interval: Duration::from_millis(50),
        stale_participant_after: Duration::from_millis(200),
        empty_room_after: Duration::from_secs(3600),
        ..ServerConfig::default()
    };
    let (relay, sink, _signal_rx) = create_test_relay_with(config);
    let alice = ConnectionId::new();
    let bob = ConnectionId::new();

    join(&relay, &alice, "R1", "Alice", Role::Host).await;
    join(&relay, &bob, "R1", "Bob", Role::Guest).await;

    // alice keeps heartbeating while bob goes silent
    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(60)).await;
        relay
            .send(RelayCommand::Heartbeat {
                from: alice.clone(),
                timestamp: epoch_millis(),
            })
            .await;
        settle(&relay).await;
    }

    let snapshot = relay.snapshot().await.expect("relay alive");
    assert_eq!(snapshot.rooms.len(), 1);
    assert_eq!(snapshot.rooms[0].participants, vec!["Alice".to_string()]);

    let alice_signals = sink.signals_for(&alice).await;
    assert!(
        alice_signals
            .iter()
            .any(|s| matches!(s, ServerSignal::UserLeft { user_name, .. } if user_name == "Bob"))
    );
}
