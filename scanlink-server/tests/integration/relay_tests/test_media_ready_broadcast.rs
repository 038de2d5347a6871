use scanlink_core::{ConnectionId, MediaInfo, Role, ServerSignal};
use scanlink_server::RelayCommand;

use crate::integration::{create_test_relay, init_tracing, join, settle};

#[tokio::test]
async fn test_media_ready_broadcast() {
    init_tracing();

    let (relay, sink, _signal_rx) = create_test_relay();
    let alice = ConnectionId::new();
    let bob = ConnectionId::new();

    join(&relay, &alice, "R1", "Alice", Role::Host).await;
    join(&relay, &bob, "R1", "Bob", Role::Guest).await;

    relay
        .send(RelayCommand::MediaReady {
            from: alice.clone(),
            room: "R1".to_string(),
            media_info: MediaInfo {
                audio: true,
                video: true,
            },
        })
        .await;
    settle(&relay).await;

    let bob_signals = sink.signals_for(&bob).await;
    match bob_signals.last() {
        Some(ServerSignal::PeerMediaReady {
            user_name,
            role,
            media_info,
            ..
        }) => {
            assert_eq!(user_name, "Alice");
            assert_eq!(*role, Role::Host);
            assert!(media_info.audio && media_info.video);
        }
        other => panic!("expected peer-media-ready, got {other:?}"),
    }

    assert!(
        !sink
            .signals_for(&alice)
            .await
            .iter()
            .any(|s| matches!(s, ServerSignal::PeerMediaReady { .. }))
    );
}
