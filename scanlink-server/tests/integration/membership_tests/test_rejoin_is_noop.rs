use scanlink_core::{ConnectionId, Role, ServerSignal};

use crate::integration::{create_test_relay, init_tracing, join};

#[tokio::test]
async fn test_rejoin_is_noop() {
    init_tracing();

    let (relay, sink, _signal_rx) = create_test_relay();
    let alice = ConnectionId::new();

    join(&relay, &alice, "R1", "Alice", Role::Host).await;
    join(&relay, &alice, "R1", "Alice", Role::Host).await;

    let snapshot = relay.snapshot().await.expect("relay alive");
    assert_eq!(snapshot.rooms.len(), 1);
    assert_eq!(snapshot.rooms[0].participant_count, 1);

    // the duplicate join produced no second broadcast
    let broadcasts = sink
        .signals_for(&alice)
        .await
        .into_iter()
        .filter(|s| matches!(s, ServerSignal::MembershipChanged { .. }))
        .count();
    assert_eq!(broadcasts, 1);
}
