//! Voice connection lifecycle tests
//!
//! Covers descriptor reconciliation, connection reuse and replacement, and
//! release on player/session teardown.

mod helpers;

use serde_json::json;

use basalt_common::protocol::PlayerUpdate;
use basalt_node::error::Error;
use basalt_node::voice::VoiceTransport;

use helpers::*;

fn voice_update(token: &str) -> PlayerUpdate {
    serde_json::from_value(json!({
        "voice": {
            "token": token,
            "endpoint": "voice.test.example",
            "sessionId": "voice-sess"
        }
    }))
    .expect("valid update payload")
}

fn play_update(token: &str, identifier: &str) -> PlayerUpdate {
    serde_json::from_value(json!({
        "identifier": identifier,
        "voice": {
            "token": token,
            "endpoint": "voice.test.example",
            "sessionId": "voice-sess"
        }
    }))
    .expect("valid update payload")
}

#[tokio::test]
async fn test_same_descriptor_reuses_connection() {
    let h = harness();
    let session = h.registry.create().await;
    let player = session.player_or_create("g1").await;

    player.update(voice_update("tok"), false).await.unwrap();
    player.update(voice_update("tok"), false).await.unwrap();

    assert_eq!(h.gateway.connect_count(), 1);
    assert_eq!(h.gateway.destroy_count(), 0);
}

#[tokio::test]
async fn test_changed_descriptor_recreates_connection() {
    let h = harness();
    let session = h.registry.create().await;
    let player = session.player_or_create("g1").await;

    player.update(voice_update("old"), false).await.unwrap();
    let old_transport = h.gateway.last_transport("g1").unwrap();

    player.update(voice_update("new"), false).await.unwrap();

    assert_eq!(h.gateway.connect_count(), 2);
    assert_eq!(h.gateway.destroy_count(), 1);
    // The stale transport was closed, not leaked
    assert!(!old_transport.is_open());
    assert!(h.gateway.last_transport("g1").unwrap().is_open());
}

#[tokio::test]
async fn test_voice_status_reported_in_snapshot() {
    let h = harness();
    let session = h.registry.create().await;
    let player = session.player_or_create("g1").await;

    let snapshot = player.snapshot().await.unwrap();
    assert!(!snapshot.voice.connected);
    assert_eq!(snapshot.voice.ping_ms, None);

    let snapshot = player.update(voice_update("tok"), false).await.unwrap();
    assert!(snapshot.voice.connected);
    assert_eq!(snapshot.voice.ping_ms, Some(42));
}

#[tokio::test]
async fn test_track_submitted_to_bound_connection() {
    let h = harness();
    let session = h.registry.create().await;
    let player = session.player_or_create("g1").await;

    // Voice settles before the track change within the same update
    player
        .update(play_update("tok", "song"), false)
        .await
        .unwrap();

    let transport = h.gateway.last_transport("g1").unwrap();
    assert_eq!(transport.submitted_count(), 1);
}

#[tokio::test]
async fn test_player_destroy_releases_connection() {
    let h = harness();
    let session = h.registry.create().await;
    let player = session.player_or_create("g1").await;
    player.update(voice_update("tok"), false).await.unwrap();

    session.destroy_player("g1").await.unwrap();
    assert_eq!(h.gateway.destroy_count(), 1);

    // A later player for the same guild starts from a clean slate and gets
    // a fresh connection
    let player = session.player_or_create("g1").await;
    let snapshot = player.snapshot().await.unwrap();
    assert!(!snapshot.voice.connected);

    player.update(voice_update("tok"), false).await.unwrap();
    assert_eq!(h.gateway.connect_count(), 2);
}

#[tokio::test]
async fn test_destroy_unknown_player_is_not_found() {
    let h = harness();
    let session = h.registry.create().await;

    let err = session.destroy_player("nope").await.unwrap_err();
    assert!(matches!(err, Error::PlayerNotFound(_)));
}

#[tokio::test]
async fn test_session_removal_tears_down_players() {
    let h = harness();
    let session = h.registry.create().await;
    let session_id = session.id().to_string();

    let p1 = session.player_or_create("g1").await;
    let p2 = session.player_or_create("g2").await;
    p1.update(voice_update("a"), false).await.unwrap();
    p2.update(voice_update("b"), false).await.unwrap();

    h.registry.remove(&session_id).await.unwrap();

    assert_eq!(h.gateway.destroy_count(), 2);
    let err = h
        .registry
        .get(&session_id)
        .await
        .err()
        .expect("session should be gone");
    assert!(matches!(err, Error::SessionNotFound(_)));
}

#[tokio::test]
async fn test_sessions_have_independent_connections() {
    let h = harness();
    let s1 = h.registry.create().await;
    let s2 = h.registry.create().await;

    // Same guild id in two sessions is two distinct connections
    let p1 = s1.player_or_create("g1").await;
    let p2 = s2.player_or_create("g1").await;
    p1.update(voice_update("tok"), false).await.unwrap();
    p2.update(voice_update("tok"), false).await.unwrap();

    assert_eq!(h.gateway.connect_count(), 2);
}
