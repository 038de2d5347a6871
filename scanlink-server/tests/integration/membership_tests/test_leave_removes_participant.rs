use scanlink_core::{ConnectionId, Role, ServerSignal};
use scanlink_server::RelayCommand;

use crate::integration::{create_test_relay, init_tracing, join, settle};

/// Abrupt disconnect of one party: the survivor gets `user-left` with the
/// reduced roster and the room stays alive.
#[tokio::test]
async fn test_leave_removes_participant() {
    init_tracing();

    let (relay, sink, _signal_rx) = create_test_relay();
    let alice = ConnectionId::new();
    let bob = ConnectionId::new();

    join(&relay, &alice, "R1", "Alice", Role::Host).await;
    join(&relay, &bob, "R1", "Bob", Role::Guest).await;

    relay
        .send(RelayCommand::Disconnect { from: bob.clone() })
        .await;
    settle(&relay).await;

    let signals = sink.signals_for(&alice).await;
    match signals.last() {
        Some(ServerSignal::UserLeft {
            user_name,
            participants,
            participant_count,
            room_stats,
            ..
        }) => {
            assert_eq!(user_name, "Bob");
            assert_eq!(participants, &vec!["Alice".to_string()]);
            assert_eq!(*participant_count, 1);
            assert_eq!(room_stats.hosts, 1);
            assert_eq!(room_stats.guests, 0);
            assert_eq!(room_stats.total, 1);
        }
        other => panic!("expected user-left, got {other:?}"),
    }

    // bob is gone but the room survives
    let snapshot = relay.snapshot().await.expect("relay alive");
    assert_eq!(snapshot.rooms.len(), 1);
    assert_eq!(snapshot.rooms[0].participants, vec!["Alice".to_string()]);

    // bob himself hears nothing about his own departure
    let bob_signals = sink.signals_for(&bob).await;
    assert!(
        !bob_signals
            .iter()
            .any(|s| matches!(s, ServerSignal::UserLeft { .. }))
    );
}
