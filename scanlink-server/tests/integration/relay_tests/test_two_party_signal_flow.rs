use scanlink_core::{ConnectionId, Role, ServerSignal};
use scanlink_server::RelayCommand;

use crate::integration::{create_test_relay, init_tracing, join, settle};

/// The two-party happy path at the relay level: host creates the room, the
/// guest joins, both see the full roster, and the offer/answer/candidate
/// exchange reaches exactly the other party.
#[tokio::test]
async fn test_two_party_signal_flow() {
    init_tracing();

    let (relay, sink, _signal_rx) = create_test_relay();
    let alice = ConnectionId::new();
    let bob = ConnectionId::new();

    join(&relay, &alice, "R1", "Alice", Role::Host).await;
    join(&relay, &bob, "R1", "Bob", Role::Guest).await;

    for conn in [&alice, &bob] {
        let signals = sink.signals_for(conn).await;
        match signals.last() {
            Some(ServerSignal::MembershipChanged {
                participants,
                participant_count,
                room_stats,
                ..
            }) => {
                assert_eq!(
                    participants,
                    &vec!["Alice".to_string(), "Bob".to_string()]
                );
                assert_eq!(*participant_count, 2);
                assert_eq!(room_stats.hosts, 1);
                assert_eq!(room_stats.guests, 1);
                assert_eq!(room_stats.total, 2);
            }
            other => panic!("expected membership-changed, got {other:?}"),
        }
    }

    relay
        .send(RelayCommand::Offer {
            from: alice.clone(),
            room: "R1".to_string(),
            sdp: "offer-sdp".to_string(),
        })
        .await;
    relay
        .send(RelayCommand::Answer {
            from: bob.clone(),
            room: "R1".to_string(),
            sdp: "answer-sdp".to_string(),
        })
        .await;
    relay
        .send(RelayCommand::IceCandidate {
            from: alice.clone(),
            room: "R1".to_string(),
            candidate: "candidate:a".to_string(),
            sdp_mid: Some("0".to_string()),
            sdp_m_line_index: Some(0),
        })
        .await;
    relay
        .send(RelayCommand::IceCandidate {
            from: bob.clone(),
            room: "R1".to_string(),
            candidate: "candidate:b".to_string(),
            sdp_mid: Some("0".to_string()),
            sdp_m_line_index: Some(0),
        })
        .await;
    settle(&relay).await;

    let alice_signals = sink.signals_for(&alice).await;
    let bob_signals = sink.signals_for(&bob).await;

    assert!(bob_signals.iter().any(
        |s| matches!(s, ServerSignal::Offer { sdp, from } if sdp == "offer-sdp" && from == &alice)
    ));
    assert!(alice_signals.iter().any(
        |s| matches!(s, ServerSignal::Answer { sdp, from } if sdp == "answer-sdp" && from == &bob)
    ));
    assert!(bob_signals.iter().any(
        |s| matches!(s, ServerSignal::IceCandidate { candidate, .. } if candidate == "candidate:a")
    ));
    assert!(alice_signals.iter().any(
        |s| matches!(s, ServerSignal::IceCandidate { candidate, .. } if candidate == "candidate:b")
    ));

    // nothing ever echoed back to its sender
    assert!(
        !alice_signals
            .iter()
            .any(|s| matches!(s, ServerSignal::Offer { .. }))
    );
    assert!(
        !bob_signals
            .iter()
            .any(|s| matches!(s, ServerSignal::Answer { .. }))
    );
    assert!(!alice_signals.iter().any(
        |s| matches!(s, ServerSignal::IceCandidate { candidate, .. } if candidate == "candidate:a")
    ));
}
