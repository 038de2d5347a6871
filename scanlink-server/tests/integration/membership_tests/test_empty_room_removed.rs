use scanlink_core::{ConnectionId, Role};
use scanlink_server::RelayCommand;

use crate::integration::{create_test_relay, init_tracing, join, settle};

/// A room vanishes the moment its last member leaves, and a later join for
/// a different room id starts from a clean slate.
#[tokio::test]
async fn test_empty_room_removed() {
    init_tracing();

    let (relay, _sink, _signal_rx) = create_test_relay();
    let alice = ConnectionId::new();
    let bob = ConnectionId::new();

    join(&relay, &alice, "R1", "Alice", Role::Host).await;
    relay
        .send(RelayCommand::Disconnect {
            from: alice.clone(),
        })
        .await;
    settle(&relay).await;

    let snapshot = relay.snapshot().await.expect("relay alive");
    assert!(snapshot.rooms.is_empty());
    assert_eq!(snapshot.connections, 0);

    join(&relay, &bob, "R2", "Bob", Role::Guest).await;

    let snapshot = relay.snapshot().await.expect("relay alive");
    assert_eq!(snapshot.rooms.len(), 1);
    assert_eq!(snapshot.rooms[0].id, "R2");
    assert_eq!(snapshot.rooms[0].participants, vec!["Bob".to_string()]);
}
