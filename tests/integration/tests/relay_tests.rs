//! Relay Integration Tests
//!
//! Each test starts its own relay on an ephemeral port.
//!
//! Run with: cargo test -p integration-tests --test relay_tests

use integration_tests::TestServer;
use relay_gateway::protocol::{Message, OnlineUser};
use reqwest::StatusCode;

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server
        .client
        .get(format!("{}/health", server.base_url()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

// ============================================================================
// Handshake Tests
// ============================================================================

#[tokio::test]
async fn test_empty_username_rejected() {
    let server = TestServer::start().await.unwrap();

    let status = server.connect_rejected("").await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(server.online_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_username_rejected_case_insensitively() {
    let server = TestServer::start().await.unwrap();
    let _first = server.connect("testuser").await.unwrap();

    for attempt in ["testuser", "TestUser", "TESTUSER"] {
        let status = server.connect_rejected(attempt).await.unwrap();
        assert_eq!(status, StatusCode::CONFLICT, "attempt {attempt}");
    }

    assert_eq!(
        server.online_users().await.unwrap(),
        vec![OnlineUser::new("testuser")]
    );
}

#[tokio::test]
async fn test_concurrent_duplicate_handshakes() {
    let server = TestServer::start().await.unwrap();

    let (a, b) = tokio::join!(server.connect_raw("Racer"), server.connect_raw("racer"));

    assert_eq!([&a, &b].iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(server.online_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_username_reusable_after_logout() {
    let server = TestServer::start().await.unwrap();

    let mut first = server.connect("alice").await.unwrap();
    first.logout().await.unwrap();
    server.wait_for_online(&[]).await.unwrap();

    let _second = server.connect("Alice").await.unwrap();
    server.wait_for_online(&["Alice"]).await.unwrap();
}

// ============================================================================
// Routing Tests
// ============================================================================

#[tokio::test]
async fn test_directed_message_delivery() {
    let server = TestServer::start().await.unwrap();
    let mut user1 = server.connect("user1").await.unwrap();
    let mut user2 = server.connect("user2").await.unwrap();

    user1.send_chat("user2", "Hello").await.unwrap();

    assert_eq!(
        user2.next_chat().await.unwrap(),
        Message::chat("user1", "user2", "Hello")
    );
}

#[tokio::test]
async fn test_sender_is_stamped_by_relay() {
    let server = TestServer::start().await.unwrap();
    let mut alice = server.connect("alice").await.unwrap();
    let mut bob = server.connect("bob").await.unwrap();

    alice
        .send_text(r#"{"from":"mallory","to":"bob","content":"trust me"}"#)
        .await
        .unwrap();

    assert_eq!(
        bob.next_chat().await.unwrap(),
        Message::chat("alice", "bob", "trust me")
    );
}

#[tokio::test]
async fn test_messages_arrive_in_order() {
    let server = TestServer::start().await.unwrap();
    let mut sender = server.connect("sender").await.unwrap();
    let mut receiver = server.connect("receiver").await.unwrap();

    let bodies = ["Message 1", "Message 2", "Message 3"];
    for body in bodies {
        sender.send_chat("receiver", body).await.unwrap();
    }

    for body in bodies {
        assert_eq!(
            receiver.next_chat().await.unwrap(),
            Message::chat("sender", "receiver", body)
        );
    }
}

#[tokio::test]
async fn test_unroutable_message_dropped_silently() {
    let server = TestServer::start().await.unwrap();
    let mut alice = server.connect("alice").await.unwrap();
    let mut bob = server.connect("bob").await.unwrap();

    alice.send_chat("nobody", "anyone there?").await.unwrap();
    alice.send_chat("bob", "after").await.unwrap();

    // The drop neither disconnects the sender nor disturbs later deliveries
    assert_eq!(
        bob.next_chat().await.unwrap(),
        Message::chat("alice", "bob", "after")
    );
    server.wait_for_online(&["alice", "bob"]).await.unwrap();
}

// ============================================================================
// Presence Tests
// ============================================================================

#[tokio::test]
async fn test_presence_broadcast_on_join() {
    let server = TestServer::start().await.unwrap();
    let mut alice = server.connect("alice").await.unwrap();
    assert_eq!(alice.roster, vec!["alice"]);

    let bob = server.connect("bob").await.unwrap();
    // The newcomer sees itself too
    assert_eq!(bob.roster, vec!["alice", "bob"]);

    alice.wait_for_presence(&["alice", "bob"]).await.unwrap();
}

#[tokio::test]
async fn test_logout_updates_presence() {
    let server = TestServer::start().await.unwrap();
    let mut alice = server.connect("alice").await.unwrap();
    let mut bob = server.connect("bob").await.unwrap();
    assert_eq!(bob.roster, vec!["alice", "bob"]);

    alice.logout().await.unwrap();

    assert_eq!(bob.next_message().await.unwrap(), Message::logout("alice"));
    assert_eq!(
        bob.next_message().await.unwrap(),
        Message::presence(vec!["bob".to_string()])
    );
    assert_eq!(
        server.online_users().await.unwrap(),
        vec![OnlineUser::new("bob")]
    );

    alice.wait_for_close().await.unwrap();
}

#[tokio::test]
async fn test_disconnect_without_logout_is_detected() {
    let server = TestServer::start().await.unwrap();
    let alice = server.connect("alice").await.unwrap();
    let mut bob = server.connect("bob").await.unwrap();
    assert_eq!(bob.roster, vec!["alice", "bob"]);

    alice.close().await.unwrap();

    server.wait_for_online(&["bob"]).await.unwrap();
    bob.wait_for_presence(&["bob"]).await.unwrap();
}

#[tokio::test]
async fn test_abrupt_drop_is_detected() {
    let server = TestServer::start().await.unwrap();
    let alice = server.connect("alice").await.unwrap();
    let _bob = server.connect("bob").await.unwrap();

    alice.abort();

    server.wait_for_online(&["bob"]).await.unwrap();
}

#[tokio::test]
async fn test_binary_frame_disconnects() {
    use futures_util::SinkExt as _;

    let server = TestServer::start().await.unwrap();
    let (mut socket, _) = tokio_tungstenite::connect_async(server.ws_url("alice"))
        .await
        .unwrap();
    server.wait_for_online(&["alice"]).await.unwrap();

    socket
        .send(tokio_tungstenite::tungstenite::Message::Binary(vec![1, 2, 3]))
        .await
        .unwrap();

    server.wait_for_online(&[]).await.unwrap();
}
