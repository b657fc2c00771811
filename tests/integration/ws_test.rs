//! Integration tests for WebSocket connection and messaging.

use serde_json::json;

use crate::helpers::{
    TestApp, connect_ws, expect_event, login_ws, next_event, send_event, send_raw,
};

#[tokio::test]
async fn test_direct_conversation_round_trip() {
    let app = TestApp::new().await;
    app.create_user("alice", "alice-password").await;
    app.create_user("bob", "bob-password").await;
    let addr = app.spawn_server().await;

    let mut alice = login_ws(addr, "alice", "alice-password").await;
    let mut bob = login_ws(addr, "bob", "bob-password").await;

    let presence = expect_event(&mut alice, "presence_changed").await;
    assert_eq!(presence["online"], json!(["alice", "bob"]));

    send_event(&mut alice, json!({"type": "join_room", "target": {"direct": "bob"}})).await;
    let history = expect_event(&mut alice, "history_loaded").await;
    assert_eq!(history["room"], "alice|bob");
    assert_eq!(history["messages"], json!([]));

    send_event(&mut bob, json!({"type": "join_room", "target": {"direct": "alice"}})).await;
    expect_event(&mut bob, "history_loaded").await;

    send_event(
        &mut alice,
        json!({"type": "send_message", "target": {"direct": "bob"}, "text": "  hi bob  "}),
    )
    .await;

    for ws in [&mut alice, &mut bob] {
        let received = expect_event(ws, "message_received").await;
        assert_eq!(received["room"], "alice|bob");
        assert_eq!(received["message"]["text"], "hi bob");
        assert_eq!(received["message"]["sender"], "alice");
        assert_eq!(received["message"]["recipient"], "bob");
    }
}

#[tokio::test]
async fn test_late_joiner_gets_global_history() {
    let app = TestApp::new().await;
    app.create_user("alice", "alice-password").await;
    app.create_user("carol", "carol-password").await;
    let addr = app.spawn_server().await;

    let mut alice = login_ws(addr, "alice", "alice-password").await;
    send_event(&mut alice, json!({"type": "join_room", "target": "global"})).await;
    expect_event(&mut alice, "history_loaded").await;
    for text in ["first", "second"] {
        send_event(
            &mut alice,
            json!({"type": "send_message", "target": "global", "text": text}),
        )
        .await;
        expect_event(&mut alice, "message_received").await;
    }

    let mut carol = login_ws(addr, "carol", "carol-password").await;
    send_event(&mut carol, json!({"type": "join_room", "target": "global"})).await;
    let history = expect_event(&mut carol, "history_loaded").await;
    let texts: Vec<&str> = history["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["first", "second"]);
    assert!(history["messages"][0].get("recipient").is_none());
}

#[tokio::test]
async fn test_errors_go_to_sender_and_keep_socket_open() {
    let app = TestApp::new().await;
    app.create_user("alice", "alice-password").await;
    let addr = app.spawn_server().await;

    let mut anon = connect_ws(addr).await;
    send_event(
        &mut anon,
        json!({"type": "send_message", "target": "global", "text": "hello"}),
    )
    .await;
    let error = next_event(&mut anon).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["code"], "AUTHORIZATION");

    send_raw(&mut anon, "{definitely not json").await;
    let error = next_event(&mut anon).await;
    assert_eq!(error["code"], "VALIDATION");

    send_event(
        &mut anon,
        json!({"type": "authenticate", "username": "alice", "password": "wrong-password"}),
    )
    .await;
    let error = next_event(&mut anon).await;
    assert_eq!(error["code"], "AUTHENTICATION");

    // Still usable after three failures.
    send_event(
        &mut anon,
        json!({"type": "authenticate", "username": "alice", "password": "alice-password"}),
    )
    .await;
    let presence = expect_event(&mut anon, "presence_changed").await;
    assert_eq!(presence["online"], json!(["alice"]));

    send_event(&mut anon, json!({"type": "join_room", "target": "global"})).await;
    expect_event(&mut anon, "history_loaded").await;
    send_event(
        &mut anon,
        json!({"type": "send_message", "target": "global", "text": "   "}),
    )
    .await;
    let error = next_event(&mut anon).await;
    assert_eq!(error["code"], "VALIDATION");
}

#[tokio::test]
async fn test_typing_reaches_only_others() {
    let app = TestApp::new().await;
    app.create_user("alice", "alice-password").await;
    app.create_user("bob", "bob-password").await;
    let addr = app.spawn_server().await;

    let mut alice = login_ws(addr, "alice", "alice-password").await;
    let mut bob = login_ws(addr, "bob", "bob-password").await;
    for ws in [&mut alice, &mut bob] {
        send_event(ws, json!({"type": "join_room", "target": "global"})).await;
        expect_event(ws, "history_loaded").await;
    }

    send_event(&mut alice, json!({"type": "typing", "target": "global"})).await;
    let typing = expect_event(&mut bob, "typing_indicator").await;
    assert_eq!(typing["from"], "alice");
    assert_eq!(typing["room"], "global");

    // Alice's next event is her own message, not her typing indicator.
    send_event(
        &mut alice,
        json!({"type": "send_message", "target": "global", "text": "done"}),
    )
    .await;
    let next = next_event(&mut alice).await;
    assert_eq!(next["type"], "message_received");
    assert_eq!(next["message"]["text"], "done");
}

#[tokio::test]
async fn test_closing_socket_updates_presence() {
    let app = TestApp::new().await;
    app.create_user("alice", "alice-password").await;
    app.create_user("bob", "bob-password").await;
    let addr = app.spawn_server().await;

    let mut alice = login_ws(addr, "alice", "alice-password").await;
    let mut bob = login_ws(addr, "bob", "bob-password").await;
    expect_event(&mut alice, "presence_changed").await;

    alice.close(None).await.expect("Failed to close socket");

    let presence = expect_event(&mut bob, "presence_changed").await;
    assert_eq!(presence["online"], json!(["bob"]));
    assert!(!app.state.realtime.hub.presence().is_online(
        &chatvibe_core::types::Identity::new("alice").unwrap()
    ));
}

#[tokio::test]
async fn test_binary_frame_gets_validation_error() {
    use futures::SinkExt;
    use tokio_tungstenite::tungstenite::Message;

    let app = TestApp::new().await;
    let addr = app.spawn_server().await;

    let mut ws = connect_ws(addr).await;
    ws.send(Message::Binary(vec![0x01, 0x02, 0x03].into()))
        .await
        .unwrap();
    let error = next_event(&mut ws).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["code"], "VALIDATION");

    send_raw(&mut ws, "{still open").await;
    let error = next_event(&mut ws).await;
    assert_eq!(error["code"], "VALIDATION");
}
