use scanlink_core::{ConnectionId, Role, ServerSignal};
use scanlink_server::RelayCommand;

use crate::integration::{create_test_relay, init_tracing, join, recv_signal};

#[tokio::test]
async fn test_heartbeat_ack() {
    init_tracing();

    let (relay, _sink, mut signal_rx) = create_test_relay();
    let alice = ConnectionId::new();

    join(&relay, &alice, "R1", "Alice", Role::Host).await;
    while signal_rx.try_recv().is_ok() {}

    relay
        .send(RelayCommand::Heartbeat {
            from: alice.clone(),
            timestamp: 123_456,
        })
        .await;

    let (to, signal) = recv_signal(&mut signal_rx).await;
    assert_eq!(to, alice);
    match signal {
        ServerSignal::HeartbeatAck {
            timestamp,
            connection_id,
            server_time,
        } => {
            assert_eq!(timestamp, 123_456);
            assert_eq!(connection_id, alice);
            assert!(server_time > 0);
        }
        other => panic!("expected heartbeat-ack, got {other:?}"),
    }
}
