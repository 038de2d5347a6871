use scanlink_core::{ConnectionId, Role, ServerSignal};
use scanlink_server::RelayCommand;

use crate::integration::{create_test_relay, init_tracing, join, settle};

#[tokio::test]
async fn test_offer_not_echoed() {
    init_tracing();

    let (relay, sink, _signal_rx) = create_test_relay();
    let alice = ConnectionId::new();
    let bob = ConnectionId::new();
    let outsider = ConnectionId::new();

    join(&relay, &alice, "R1", "Alice", Role::Host).await;
    join(&relay, &bob, "R1", "Bob", Role::Guest).await;

    relay
        .send(RelayCommand::Offer {
            from: alice.clone(),
            room: "R1".to_string(),
            sdp: "v=0 offer".to_string(),
        })
        .await;
    // a non-member's offer goes nowhere
    relay
        .send(RelayCommand::Offer {
            from: outsider.clone(),
            room: "R1".to_string(),
            sdp: "v=0 bogus".to_string(),
        })
        .await;
    settle(&relay).await;

    let bob_offers: Vec<_> = sink
        .signals_for(&bob)
        .await
        .into_iter()
        .filter(|s| matches!(s, ServerSignal::Offer { .. }))
        .collect();
    assert_eq!(bob_offers.len(), 1);
    match &bob_offers[0] {
        ServerSignal::Offer { sdp, from } => {
            assert_eq!(sdp, "v=0 offer");
            assert_eq!(from, &alice);
        }
        other => panic!("expected offer, got {other:?}"),
    }

    // the sender never hears its own offer back
    let alice_signals = sink.signals_for(&alice).await;
    assert!(
        !alice_signals
            .iter()
            .any(|s| matches!(s, ServerSignal::Offer { .. }))
    );
}
