//! End-to-end tests for the text protocol server.
//!
//! A device is exposed through `TextServer` on one end of a
//! `ChannelTransport` pair; the test plays the remote peer on the other end.

#![cfg(feature = "net")]

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use pretty_assertions::assert_eq;

use paramnet::protocol::text::{self, TextMessage};
use paramnet::protocol::transport::{ChannelTransport, Transport};
use paramnet::{BoundingMode, Device, Domain, TextServer, Value, ValueType, WireArg};

// ============================================================================
// Helper: a running server and the peer end of its transport.
// ============================================================================

struct Harness {
    device: Device,
    server: Arc<TextServer>,
    peer: ChannelTransport,
    task: tokio::task::JoinHandle<paramnet::Result<()>>,
}

fn start() -> Harness {
    let device = Device::new("remote");
    let cutoff = device.create_parameter("/synth/cutoff", ValueType::Float).unwrap();
    cutoff.set_domain(Some(Domain::float(20.0, 20_000.0)));
    cutoff.set_bounding_mode(BoundingMode::Clip);
    device.create_parameter("/synth/wave", ValueType::String).unwrap();
    device.create_parameter("/mix/gain", ValueType::Int).unwrap();

    let (local, peer) = ChannelTransport::pair();
    let (server, outbound) = TextServer::expose(&device, "text");
    let task = tokio::spawn(server.clone().run(Arc::new(local), outbound));
    Harness { device, server, peer, task }
}

async fn next_line(peer: &ChannelTransport) -> TextMessage {
    let packet = tokio::time::timeout(Duration::from_secs(2), peer.recv())
        .await
        .expect("timed out waiting for the server")
        .unwrap()
        .expect("server closed the transport");
    text::parse(std::str::from_utf8(&packet).unwrap()).unwrap()
}

async fn send(peer: &ChannelTransport, line: &str) {
    peer.send(Bytes::from(line.to_owned())).await.unwrap();
}

/// Wait until `path` holds `expected`; inbound packets are applied on the
/// server task.
async fn wait_for(device: &Device, path: &str, expected: Value) {
    for _ in 0..200 {
        if device.fetch(path).unwrap() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("{path} never became {expected}, is {}", device.fetch(path).unwrap());
}

// ============================================================================
// 1. Inbound set messages run the full pipeline
// ============================================================================

#[tokio::test]
async fn test_remote_set_is_bounded() {
    let h = start();
    send(&h.peer, "/synth/cutoff 50000.0").await;
    wait_for(&h.device, "/synth/cutoff", Value::Float(20_000.0)).await;

    send(&h.peer, r#"/synth/wave "saw tooth""#).await;
    wait_for(&h.device, "/synth/wave", Value::from("saw tooth")).await;
    h.task.abort();
}

// ============================================================================
// 2. Requests are answered
// ============================================================================

#[tokio::test]
async fn test_get_and_namespace_requests() {
    let h = start();
    h.device.resolve("/mix/gain").unwrap().set_value_quiet(7).unwrap();

    send(&h.peer, "?get /mix/gain").await;
    assert_eq!(
        next_line(&h.peer).await,
        TextMessage::GetReply { path: "/mix/gain".into(), args: vec![WireArg::Int32(7)] }
    );

    send(&h.peer, "?namespace /").await;
    assert_eq!(
        next_line(&h.peer).await,
        TextMessage::NamespaceReply { path: "/".into(), children: vec!["synth".into(), "mix".into()] }
    );
    h.task.abort();
}

#[tokio::test]
async fn test_unknown_path_gets_no_reply() {
    let h = start();
    send(&h.peer, "?get /does/not/exist\n?get /mix/gain").await;
    // only the second request is answered
    assert_eq!(next_line(&h.peer).await.path(), "/mix/gain");
    h.task.abort();
}

// ============================================================================
// 3. Local pushes are sent out, remote sets are not echoed
// ============================================================================

#[tokio::test]
async fn test_local_push_reaches_peer() {
    let h = start();
    h.device.resolve("/synth/cutoff").unwrap().push_value(440.0f32).unwrap();
    assert_eq!(
        next_line(&h.peer).await,
        TextMessage::Set { path: "/synth/cutoff".into(), args: vec![WireArg::Float32(440.0)] }
    );

    // set_value is local only
    h.device.resolve("/mix/gain").unwrap().set_value(3).unwrap();
    h.device.resolve("/mix/gain").unwrap().push_value(4).unwrap();
    assert_eq!(
        next_line(&h.peer).await,
        TextMessage::Set { path: "/mix/gain".into(), args: vec![WireArg::Int32(4)] }
    );
    h.task.abort();
}

#[tokio::test]
async fn test_remote_set_is_not_echoed() {
    let h = start();
    send(&h.peer, "/mix/gain 9").await;
    wait_for(&h.device, "/mix/gain", Value::Int(9)).await;

    h.device.resolve("/mix/gain").unwrap().push_value(10).unwrap();
    // the first thing the peer sees is the local push, not an echo of 9
    assert_eq!(
        next_line(&h.peer).await,
        TextMessage::Set { path: "/mix/gain".into(), args: vec![WireArg::Int32(10)] }
    );
    h.task.abort();
}

// ============================================================================
// 4. Lifecycle
// ============================================================================

#[tokio::test]
async fn test_peer_close_stops_server_and_detaches() {
    let h = start();
    assert_eq!(h.device.protocol_count(), 1);
    h.peer.close().await.unwrap();
    let result = tokio::time::timeout(Duration::from_secs(2), h.task).await.unwrap().unwrap();
    assert!(result.is_ok());
    assert_eq!(h.device.protocol_count(), 0);
    assert!(!h.server.detach());
}

#[tokio::test]
async fn test_malformed_lines_are_skipped() {
    let h = start();
    send(&h.peer, "garbage here\n/mix/gain 5\n/mix/gain \"unterminated").await;
    wait_for(&h.device, "/mix/gain", Value::Int(5)).await;
    h.task.abort();
}
