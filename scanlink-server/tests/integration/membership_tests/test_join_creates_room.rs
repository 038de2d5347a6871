use scanlink_core::{ConnectionId, Role, ServerSignal};

use crate::integration::{create_test_relay, init_tracing, join};

#[tokio::test]
async fn test_join_creates_room() {
    init_tracing();

    let (relay, sink, _signal_rx) = create_test_relay();
    let alice = ConnectionId::new();

    join(&relay, &alice, "R1", "Alice", Role::Host).await;

    let snapshot = relay.snapshot().await.expect("relay alive");
    assert_eq!(snapshot.rooms.len(), 1);
    assert_eq!(snapshot.rooms[0].id, "R1");
    assert_eq!(snapshot.rooms[0].host.as_deref(), Some("Alice"));

    let signals = sink.signals_for(&alice).await;
    assert_eq!(signals.len(), 1);
    match &signals[0] {
        ServerSignal::MembershipChanged {
            user_name,
            participants,
            participant_count,
            room_stats,
            ..
        } => {
            assert_eq!(user_name, "Alice");
            assert_eq!(participants, &vec!["Alice".to_string()]);
            assert_eq!(*participant_count, 1);
            assert_eq!(room_stats.hosts, 1);
            assert_eq!(room_stats.total, 1);
        }
        other => panic!("expected membership-changed, got {other:?}"),
    }
}
