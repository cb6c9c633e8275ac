//! Integration tests for cmdwire.
//!
//! Each test drives a full connection over an in-memory duplex stream,
//! playing the remote peer by hand: writing length-prefixed JSON frames into
//! one half and reading what the connection sends back.

use cmdwire::encryption::{EncryptionEngine, KeyExchangeParams};
use cmdwire::transport::frame_message;
use cmdwire::{CmdwireError, Connection, Notification};
use serde_json::{json, Map, Value};
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

const XOR_KEY: u8 = 0x5A;

/// Symmetric mock engine: XORs every byte with a fixed key.
struct XorEngine;

impl EncryptionEngine for XorEngine {
    fn begin_key_exchange(&mut self) -> KeyExchangeParams {
        KeyExchangeParams {
            public_key: "local-public-key".to_string(),
        }
    }

    fn complete_key_exchange(
        &mut self,
        _remote_public_key: &str,
        _remote_salt: &str,
    ) -> cmdwire::Result<()> {
        Ok(())
    }

    fn encrypt(&mut self, data: &[u8]) -> Vec<u8> {
        data.iter().map(|b| b ^ XOR_KEY).collect()
    }

    fn decrypt(&mut self, data: &[u8]) -> Vec<u8> {
        data.iter().map(|b| b ^ XOR_KEY).collect()
    }
}

fn xor(data: &[u8]) -> Vec<u8> {
    data.iter().map(|b| b ^ XOR_KEY).collect()
}

/// Write one frame into the peer half, optionally XOR-"encrypted".
async fn write_frame(peer: &mut DuplexStream, frame: &Value, encrypted: bool) {
    let mut payload = serde_json::to_vec(frame).unwrap();
    if encrypted {
        payload = xor(&payload);
    }
    peer.write_all(&frame_message(&payload)).await.unwrap();
}

/// Read one raw payload from the peer half.
async fn read_payload(peer: &mut DuplexStream) -> Vec<u8> {
    let mut prefix = [0u8; 4];
    peer.read_exact(&mut prefix).await.unwrap();
    let mut payload = vec![0u8; u32::from_be_bytes(prefix) as usize];
    peer.read_exact(&mut payload).await.unwrap();
    payload
}

/// Read one frame the connection sent, optionally XOR-"decrypting" it.
async fn read_frame(peer: &mut DuplexStream, encrypted: bool) -> Value {
    let mut payload = read_payload(peer).await;
    if encrypted {
        payload = xor(&payload);
    }
    serde_json::from_slice(&payload).unwrap()
}

fn subscribe_frame(event_name: &str) -> Value {
    json!({
        "header": { "version": 1, "messagePurpose": "subscribe" },
        "body": { "eventName": event_name }
    })
}

fn unsubscribe_frame(event_name: &str) -> Value {
    json!({
        "header": { "version": 1, "messagePurpose": "unsubscribe" },
        "body": { "eventName": event_name }
    })
}

fn command_frame(request_id: &str, command_line: &str) -> Value {
    json!({
        "header": { "version": 1, "messagePurpose": "commandRequest", "requestId": request_id },
        "body": { "commandLine": command_line }
    })
}

#[tokio::test]
async fn duplicate_subscribe_notifies_once() {
    let (local, mut peer) = duplex(64 * 1024);
    let (connection, mut notifications) = Connection::builder().start(local);

    write_frame(&mut peer, &subscribe_frame("blockBroken"), false).await;
    write_frame(&mut peer, &subscribe_frame("blockBroken"), false).await;

    // First frame: typed notification, then generic.
    match notifications.recv().await.unwrap() {
        Notification::Subscribe { event_name, .. } => assert_eq!(event_name, "blockBroken"),
        other => panic!("expected Subscribe, got {other:?}"),
    }
    assert!(matches!(
        notifications.recv().await.unwrap(),
        Notification::Message { .. }
    ));

    // Second frame is absorbed: only the generic notification fires.
    assert!(matches!(
        notifications.recv().await.unwrap(),
        Notification::Message { .. }
    ));

    assert!(connection.is_subscribed("blockBroken"));
}

#[tokio::test]
async fn publish_respects_subscription_state() {
    let (local, mut peer) = duplex(64 * 1024);
    let (connection, mut notifications) = Connection::builder().start(local);

    // Not yet subscribed: publish is a silent no-op.
    let mut body = Map::new();
    body.insert("pos".to_string(), json!([0, 64, 0]));
    connection.publish_event("blockBroken", body.clone()).await.unwrap();

    write_frame(&mut peer, &subscribe_frame("blockBroken"), false).await;
    assert!(matches!(
        notifications.recv().await.unwrap(),
        Notification::Subscribe { .. }
    ));
    assert!(matches!(
        notifications.recv().await.unwrap(),
        Notification::Message { .. }
    ));

    // Subscribed: the event goes out (V1 shape merges eventName into body).
    connection.publish_event("blockBroken", body.clone()).await.unwrap();
    let frame = read_frame(&mut peer, false).await;
    assert_eq!(frame["header"]["messagePurpose"], json!("event"));
    assert_eq!(frame["body"]["eventName"], json!("blockBroken"));
    assert_eq!(frame["body"]["pos"], json!([0, 64, 0]));

    // Unsubscribed again: back to a no-op.
    write_frame(&mut peer, &unsubscribe_frame("blockBroken"), false).await;
    assert!(matches!(
        notifications.recv().await.unwrap(),
        Notification::Unsubscribe { .. }
    ));
    assert!(matches!(
        notifications.recv().await.unwrap(),
        Notification::Message { .. }
    ));

    connection.publish_event("blockBroken", body).await.unwrap();
    // Nothing was sent for the publish; the next frame on the wire is the
    // error we send right after.
    connection.send_error(7, "done", None).await.unwrap();
    let frame = read_frame(&mut peer, false).await;
    assert_eq!(frame["header"]["messagePurpose"], json!("error"));
    assert_eq!(frame["body"]["statusCode"], json!(7));
}

#[tokio::test]
async fn command_request_yields_command_notification() {
    let (local, mut peer) = duplex(64 * 1024);
    let (connection, mut notifications) = Connection::builder().start(local);

    write_frame(&mut peer, &command_frame("r2", "list"), false).await;

    let cmd = match notifications.recv().await.unwrap() {
        Notification::Command(cmd) => cmd,
        other => panic!("expected Command, got {other:?}"),
    };
    assert_eq!(cmd.command_line, "list");
    assert_eq!(cmd.request_id.as_str(), "r2");
    assert!(matches!(
        notifications.recv().await.unwrap(),
        Notification::Message { .. }
    ));

    // Not a handshake trigger: no side effects.
    assert!(!cmd.context.handle_encryption_handshake().await.unwrap());
    assert!(!connection.is_encrypted());

    // Respond through the bound context.
    let mut body = Map::new();
    body.insert("statusCode".to_string(), json!(0));
    cmd.context.respond(body).await.unwrap();

    let frame = read_frame(&mut peer, false).await;
    assert_eq!(frame["header"]["messagePurpose"], json!("commandResponse"));
    assert_eq!(frame["header"]["requestId"], json!("r2"));
    assert_eq!(frame["body"]["statusCode"], json!(0));
}

#[tokio::test]
async fn legacy_command_shape_is_routed() {
    let (local, mut peer) = duplex(64 * 1024);
    let (_connection, mut notifications) = Connection::builder().start(local);

    write_frame(
        &mut peer,
        &json!({
            "header": { "version": 1, "messagePurpose": "commandRequest", "requestId": "r3" },
            "body": { "name": "give", "overload": "default", "input": { "item": "apple" } }
        }),
        false,
    )
    .await;

    let cmd = match notifications.recv().await.unwrap() {
        Notification::CommandLegacy(cmd) => cmd,
        other => panic!("expected CommandLegacy, got {other:?}"),
    };
    assert_eq!(cmd.request_id.as_str(), "r3");
    assert_eq!(cmd.command_name.as_deref(), Some("give"));
    assert_eq!(cmd.overload.as_deref(), Some("default"));
    assert_eq!(
        cmd.input.as_ref().and_then(|m| m.get("item")),
        Some(&json!("apple"))
    );
    assert!(matches!(
        notifications.recv().await.unwrap(),
        Notification::Message { .. }
    ));

    // A legacy request has no command line, so it can never be a handshake.
    assert!(!cmd.context.handle_encryption_handshake().await.unwrap());

    cmd.context.respond(Map::new()).await.unwrap();
    let frame = read_frame(&mut peer, false).await;
    assert_eq!(frame["header"]["requestId"], json!("r3"));
}

#[tokio::test]
async fn unknown_purpose_yields_custom_frame_then_message() {
    let (local, mut peer) = duplex(64 * 1024);
    let (_connection, mut notifications) = Connection::builder().start(local);

    write_frame(
        &mut peer,
        &json!({ "header": { "messagePurpose": "unknownThing" }, "body": {} }),
        false,
    )
    .await;
    // A follow-up frame proves nothing else was queued in between.
    write_frame(&mut peer, &subscribe_frame("playerJoin"), false).await;

    match notifications.recv().await.unwrap() {
        Notification::CustomFrame { frame } => {
            assert_eq!(frame.purpose().as_str(), "unknownThing");
        }
        other => panic!("expected CustomFrame, got {other:?}"),
    }
    assert!(matches!(
        notifications.recv().await.unwrap(),
        Notification::Message { .. }
    ));
    assert!(matches!(
        notifications.recv().await.unwrap(),
        Notification::Subscribe { .. }
    ));
}

#[tokio::test]
async fn encryption_handshake_end_to_end() {
    let (local, mut peer) = duplex(64 * 1024);
    let (connection, mut notifications) = Connection::builder()
        .with_encryption(|| XorEngine)
        .start(local);

    write_frame(
        &mut peer,
        &command_frame("r1", r#"enableencryption "REMOTE-KEY" "REMOTE-SALT""#),
        false,
    )
    .await;

    let cmd = match notifications.recv().await.unwrap() {
        Notification::Command(cmd) => cmd,
        other => panic!("expected Command, got {other:?}"),
    };
    assert!(matches!(
        notifications.recv().await.unwrap(),
        Notification::Message { .. }
    ));

    assert!(cmd.context.handle_encryption_handshake().await.unwrap());
    assert!(connection.is_encrypted());

    // The key-exchange response went out in plaintext, correlated to r1.
    let response = read_frame(&mut peer, false).await;
    assert_eq!(response["header"]["messagePurpose"], json!("commandResponse"));
    assert_eq!(response["header"]["requestId"], json!("r1"));
    assert_eq!(response["body"]["publicKey"], json!("local-public-key"));
    assert_eq!(response["body"]["statusCode"], json!(0));

    // The enablement notification fires exactly once.
    assert!(matches!(
        notifications.recv().await.unwrap(),
        Notification::EncryptionEnabled
    ));

    // Everything sent after activation is encrypted.
    connection.send_error(0, "ok", None).await.unwrap();
    let frame = read_frame(&mut peer, true).await;
    assert_eq!(frame["header"]["messagePurpose"], json!("error"));

    // Inbound traffic is decrypted before routing.
    write_frame(&mut peer, &subscribe_frame("playerJoin"), true).await;
    match notifications.recv().await.unwrap() {
        Notification::Subscribe { event_name, .. } => assert_eq!(event_name, "playerJoin"),
        other => panic!("expected Subscribe, got {other:?}"),
    }
}

#[tokio::test]
async fn second_handshake_is_rejected() {
    let (local, mut peer) = duplex(64 * 1024);
    let (connection, mut notifications) = Connection::builder()
        .with_encryption(|| XorEngine)
        .start(local);

    write_frame(
        &mut peer,
        &command_frame("r1", r#"enableencryption "KEY-A" "SALT-A""#),
        false,
    )
    .await;

    let first = match notifications.recv().await.unwrap() {
        Notification::Command(cmd) => cmd,
        other => panic!("expected Command, got {other:?}"),
    };
    assert!(matches!(
        notifications.recv().await.unwrap(),
        Notification::Message { .. }
    ));
    assert!(first.context.handle_encryption_handshake().await.unwrap());
    let _ = read_frame(&mut peer, false).await;
    assert!(matches!(
        notifications.recv().await.unwrap(),
        Notification::EncryptionEnabled
    ));

    // Peer tries again over the now-encrypted channel.
    write_frame(
        &mut peer,
        &command_frame("r2", r#"enableencryption "KEY-B" "SALT-B""#),
        true,
    )
    .await;

    let second = match notifications.recv().await.unwrap() {
        Notification::Command(cmd) => cmd,
        other => panic!("expected Command, got {other:?}"),
    };
    let result = second.context.handle_encryption_handshake().await;
    assert!(matches!(result, Err(CmdwireError::HandshakeAlreadyActive)));
    assert!(connection.is_encrypted());
}

#[tokio::test]
async fn malformed_inbound_bytes_surface_as_error() {
    let (local, mut peer) = duplex(64 * 1024);
    let (connection, mut notifications) = Connection::builder().start(local);

    peer.write_all(&frame_message(b"this is not json")).await.unwrap();

    assert!(matches!(
        notifications.recv().await.unwrap(),
        Notification::Disconnect
    ));

    // With the last connection handle gone, the stream ends.
    drop(connection);
    assert!(notifications.recv().await.is_none());

    let result = notifications.closed().await;
    assert!(matches!(result, Err(CmdwireError::MalformedFrame(_))));
}

#[tokio::test]
async fn peer_close_yields_clean_disconnect() {
    let (local, peer) = duplex(64 * 1024);
    let (_connection, mut notifications) = Connection::builder().start(local);

    drop(peer);

    assert!(matches!(
        notifications.recv().await.unwrap(),
        Notification::Disconnect
    ));
    assert!(notifications.closed().await.is_ok());
}

#[tokio::test]
async fn local_disconnect_closes_both_sides() {
    let (local, mut peer) = duplex(64 * 1024);
    let (connection, mut notifications) = Connection::builder().start(local);

    connection.disconnect().await;

    assert!(matches!(
        notifications.recv().await.unwrap(),
        Notification::Disconnect
    ));
    assert!(notifications.closed().await.is_ok());

    // Write half was shut down: the peer sees EOF.
    let mut buf = [0u8; 1];
    assert_eq!(peer.read(&mut buf).await.unwrap(), 0);

    // Sending after disconnect fails.
    let result = connection.send_error(0, "late", None).await;
    assert!(matches!(result, Err(CmdwireError::ConnectionClosed)));
}

#[tokio::test]
async fn fragmented_inbound_frames_are_reassembled() {
    let (local, mut peer) = duplex(64 * 1024);
    let (_connection, mut notifications) = Connection::builder().start(local);

    let payload = serde_json::to_vec(&subscribe_frame("playerTravelled")).unwrap();
    let wire = frame_message(&payload);

    // Drip the frame in three pieces.
    peer.write_all(&wire[..3]).await.unwrap();
    peer.flush().await.unwrap();
    peer.write_all(&wire[3..10]).await.unwrap();
    peer.flush().await.unwrap();
    peer.write_all(&wire[10..]).await.unwrap();

    match notifications.recv().await.unwrap() {
        Notification::Subscribe { event_name, .. } => assert_eq!(event_name, "playerTravelled"),
        other => panic!("expected Subscribe, got {other:?}"),
    }
}
