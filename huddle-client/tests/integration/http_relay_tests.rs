use huddle_client::{HttpRelay, RelayError, SignalRelay};
use huddle_core::{HandshakeMessage, Participant, ParticipantId, RoomCode, Signal};
use huddle_server::{AppState, serve_on};
use std::time::Duration;
use tokio::net::TcpListener;

use crate::integration::init_tracing;

async fn spawn_relay() -> HttpRelay {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_on(listener, AppState::new()));
    HttpRelay::new(format!("http://{addr}/"), Duration::from_secs(2)).unwrap()
}

fn room() -> RoomCode {
    RoomCode::from("ABC123")
}

#[tokio::test]
async fn test_join_and_call_status_over_http() {
    init_tracing();
    let relay = spawn_relay().await;
    let alice = Participant::new("alice", "Alice");
    let bob = Participant::new("bob", "Bob");

    relay.join(&room(), &alice).await.unwrap();
    let roster = relay.join(&room(), &bob).await.unwrap();
    assert_eq!(roster.len(), 2);
    assert_eq!(roster.get(&bob.id).unwrap().participant.display_name, "Bob");

    let roster = relay.set_call_status(&room(), &alice.id, true).await.unwrap();
    assert!(roster.get(&alice.id).unwrap().in_call());
    assert!(!roster.get(&bob.id).unwrap().in_call());

    relay.leave(&room(), &bob.id).await.unwrap();
    let roster = relay.roster(&room(), &alice.id).await.unwrap();
    let ids: Vec<_> = roster.ids().cloned().collect();
    assert_eq!(ids, vec![alice.id]);
}

#[tokio::test]
async fn test_signal_round_trip_over_http() {
    init_tracing();
    let relay = spawn_relay().await;
    let bob = ParticipantId::from("bob");
    relay.join(&room(), &Participant::new("bob", "Bob")).await.unwrap();
    let signal = Signal {
        from: ParticipantId::from("alice"),
        message: HandshakeMessage::Offer {
            sdp: "v=0".to_string(),
        },
        timestamp: 1_234,
    };

    relay.send(&room(), &bob, &signal).await.unwrap();

    let drained = relay.drain(&room(), &bob).await.unwrap();
    assert_eq!(drained, vec![signal]);
    assert!(relay.drain(&room(), &bob).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_signal_to_non_member_is_accepted_and_dropped() {
    init_tracing();
    let relay = spawn_relay().await;
    let ghost = ParticipantId::from("ghost");
    let signal = Signal::new(
        ParticipantId::from("alice"),
        HandshakeMessage::Offer {
            sdp: "v=0".to_string(),
        },
    );

    relay.send(&room(), &ghost, &signal).await.unwrap();

    assert!(relay.drain(&room(), &ghost).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_request_is_not_transient() {
    init_tracing();
    let relay = spawn_relay().await;
    let alice = ParticipantId::from("alice");
    let signal = Signal::new(
        alice.clone(),
        HandshakeMessage::Answer {
            sdp: "v=0".to_string(),
        },
    );

    let err = relay.send(&room(), &alice, &signal).await.unwrap_err();

    assert!(matches!(err, RelayError::Rejected(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_unreachable_relay_is_transient() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let relay = HttpRelay::new(format!("http://{addr}"), Duration::from_millis(500)).unwrap();

    let err = relay
        .roster(&room(), &ParticipantId::from("alice"))
        .await
        .unwrap_err();

    assert!(err.is_transient());
}
