use axum::http::StatusCode;
use huddle_core::{ParticipantId, RoomCode};
use serde_json::json;

use crate::integration::init_tracing;
use crate::utils::TestRelay;

fn offer_from(from: &str, to: &str, timestamp: i64) -> serde_json::Value {
    json!({
        "room": "ABC123",
        "fromParticipant": from,
        "toParticipant": to,
        "message": {"type": "offer", "sdp": "v=0"},
        "timestamp": timestamp,
    })
}

#[tokio::test]
async fn test_drain_deletes_returned_signals() {
    init_tracing();
    let relay = TestRelay::new();
    relay.join("ABC123", "bob").await;

    let (status, body) = relay.post("/signal/send", offer_from("alice", "bob", 10)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, first) = relay.get("/signal/ABC123/bob").await;
    let signals = first["signals"].as_array().unwrap();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0]["fromParticipant"], "alice");
    assert_eq!(signals[0]["timestamp"], 10);
    assert_eq!(signals[0]["message"]["type"], "offer");

    let (_, second) = relay.get("/signal/ABC123/bob").await;
    assert_eq!(second["success"], true);
    assert!(second["signals"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_relay_stamps_missing_timestamp() {
    init_tracing();
    let relay = TestRelay::new();
    relay.join("ABC123", "bob").await;

    let mut request = offer_from("alice", "bob", 0);
    request.as_object_mut().unwrap().remove("timestamp");
    relay.post("/signal/send", request).await;

    let (_, body) = relay.get("/signal/ABC123/bob").await;
    assert!(body["signals"][0]["timestamp"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_ice_candidates_keep_fifo_order() {
    init_tracing();
    let relay = TestRelay::new();
    relay.join("ABC123", "bob").await;

    for (idx, ts) in [30, 10, 20].into_iter().enumerate() {
        relay
            .post(
                "/signal/send",
                json!({
                    "room": "ABC123",
                    "fromParticipant": "alice",
                    "toParticipant": "bob",
                    "message": {
                        "type": "iceCandidate",
                        "candidate": {"candidate": format!("candidate:{idx}")}
                    },
                    "timestamp": ts,
                }),
            )
            .await;
    }

    let (_, body) = relay.get("/signal/ABC123/bob").await;
    let order: Vec<_> = body["signals"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["message"]["candidate"]["candidate"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(order, vec!["candidate:0", "candidate:1", "candidate:2"]);
}

#[tokio::test]
async fn test_malformed_message_is_rejected() {
    init_tracing();
    let relay = TestRelay::new();
    relay.join("ABC123", "bob").await;

    let (status, _) = relay
        .post(
            "/signal/send",
            json!({
                "room": "ABC123",
                "fromParticipant": "alice",
                "toParticipant": "bob",
                "message": {"type": "renegotiate"},
            }),
        )
        .await;

    assert!(status.is_client_error());
    assert_eq!(
        relay
            .state
            .mailbox
            .pending(&RoomCode::from("ABC123"), &ParticipantId::from("bob")),
        0
    );
}

#[tokio::test]
async fn test_self_addressed_signal_is_rejected() {
    init_tracing();
    let relay = TestRelay::new();

    let (status, body) = relay.post("/signal/send", offer_from("alice", "alice", 1)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_leave_purges_pending_signals() {
    init_tracing();
    let relay = TestRelay::new();

    relay.join("ABC123", "bob").await;
    relay.post("/signal/send", offer_from("alice", "bob", 1)).await;
    relay
        .post("/rooms/ABC123/leave", json!({"participant": "bob"}))
        .await;

    let (_, body) = relay.get("/signal/ABC123/bob").await;
    assert!(body["signals"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_signal_to_departed_member_is_dropped() {
    init_tracing();
    let relay = TestRelay::new();
    let room = RoomCode::from("ABC123");
    let bob = ParticipantId::from("bob");

    relay.join("ABC123", "bob").await;
    relay
        .post("/rooms/ABC123/leave", json!({"participant": "bob"}))
        .await;

    let late_candidate = json!({
        "room": "ABC123",
        "fromParticipant": "alice",
        "toParticipant": "bob",
        "message": {
            "type": "iceCandidate",
            "candidate": {"candidate": "candidate:late"}
        },
        "timestamp": 2,
    });
    let (status, body) = relay.post("/signal/send", late_candidate).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(relay.state.mailbox.pending(&room, &bob), 0);
}

#[tokio::test]
async fn test_signal_to_unknown_participant_is_dropped() {
    init_tracing();
    let relay = TestRelay::new();

    let (status, body) = relay.post("/signal/send", offer_from("alice", "ghost", 1)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(
        relay
            .state
            .mailbox
            .pending(&RoomCode::from("ABC123"), &ParticipantId::from("ghost")),
        0
    );
}
