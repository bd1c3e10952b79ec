//! Chunked delivery over real channels

#![allow(clippy::unwrap_used, clippy::expect_used)]

use envelope_protocol::config::{HandlerMode, TransportConfig};
use envelope_protocol::core::chunker::Chunker;
use envelope_protocol::error::EnvelopeError;
use envelope_protocol::service::{Orchestrator, StreamSession};
use envelope_protocol::transport::{Channel, MemoryChannel, TcpChannel};
use envelope_protocol::utils::crypto::SecurityManager;
use envelope_protocol::{json, Value};
use std::time::Duration;
use tokio::net::TcpListener;

const KEY: [u8; 32] = [7u8; 32];

fn orchestrator(mode: HandlerMode, chunk_size: usize) -> Orchestrator {
    Orchestrator::builder()
        .security(SecurityManager::new(KEY))
        .encrypt(true)
        .handler(mode, chunk_size)
        .build()
        .unwrap()
}

fn telemetry() -> Value {
    json!({
        "device": "probe-4",
        "samples": (0..256).map(|i| i * 3).collect::<Vec<i32>>(),
        "ok": true
    })
}

#[tokio::test]
async fn test_memory_stream_mode_end_to_end() {
    let sender = orchestrator(HandlerMode::Stream, 100);
    let receiver = orchestrator(HandlerMode::Batch, 1);
    let (a, b) = MemoryChannel::pair(8);

    let envelope = sender.encode(&telemetry()).unwrap();
    let expected_chunks = sender.to_chunks(&envelope).unwrap().len();

    let send_task = tokio::spawn(async move {
        let mut session = StreamSession::new(a, *sender.chunker());
        let sent = session.send_envelope(&envelope).await.unwrap();
        session.close().await.unwrap();
        sent
    });

    let mut session = StreamSession::new(b, Chunker::batch());
    let received = session
        .receive_envelope_within(Duration::from_secs(5))
        .await
        .unwrap();

    let sent = send_task.await.unwrap();
    assert_eq!(sent, expected_chunks);
    assert!(sent > 1);
    assert_eq!(session.metrics().chunks_received, sent as u64);
    assert_eq!(receiver.decode(&received, true).unwrap(), telemetry());
}

#[tokio::test]
async fn test_tcp_stream_mode_end_to_end() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let channel = TcpChannel::accept(&listener).await.unwrap();
        let mut session = StreamSession::new(channel, Chunker::batch());
        session.receive_envelope().await
    });

    let sender = orchestrator(HandlerMode::Stream, 64);
    let envelope = sender.encode(&telemetry()).unwrap();

    let channel = TcpChannel::connect(&addr).await.unwrap();
    let mut session = StreamSession::new(channel, *sender.chunker());
    session.send_envelope(&envelope).await.unwrap();
    session.close().await.unwrap();

    let received = server.await.unwrap().unwrap();
    assert_eq!(received, envelope);
    assert_eq!(sender.decode(&received, true).unwrap(), telemetry());
}

#[tokio::test]
async fn test_tcp_batch_mode_single_frame() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let mut channel = TcpChannel::accept(&listener).await.unwrap();
        let mut frames = 0usize;
        while channel.recv().await.unwrap().is_some() {
            frames += 1;
        }
        frames
    });

    let sender = orchestrator(HandlerMode::Batch, 1);
    let envelope = sender.encode(&telemetry()).unwrap();
    let mut session = StreamSession::new(TcpChannel::connect(&addr).await.unwrap(), *sender.chunker());
    assert_eq!(session.send_envelope(&envelope).await.unwrap(), 1);
    session.close().await.unwrap();

    assert_eq!(server.await.unwrap(), 1);
}

#[tokio::test]
async fn test_tcp_batch_envelope_over_frame_limit_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = TransportConfig {
        address: listener.local_addr().unwrap().to_string(),
        max_frame_size: 256,
        ..TransportConfig::default()
    };
    let server = tokio::spawn(async move { TcpChannel::accept(&listener).await });

    let sender = Orchestrator::builder()
        .compression(None)
        .handler(HandlerMode::Batch, 1)
        .build()
        .unwrap();
    let envelope = sender.encode(&telemetry()).unwrap();
    assert!(envelope.to_bytes().unwrap().len() > 256);

    let channel = TcpChannel::connect_with(&config).await.unwrap();
    let _peer = server.await.unwrap().unwrap();
    let mut session = StreamSession::new(channel, *sender.chunker());
    assert!(matches!(
        session.send_envelope(&envelope).await,
        Err(EnvelopeError::Network(_))
    ));
    assert_eq!(session.metrics().chunks_sent, 0);
}

#[tokio::test]
async fn test_corrupt_stream_reports_error() {
    let (mut a, b) = MemoryChannel::pair(4);
    a.send(bytes::Bytes::from_static(b"definitely not an envelope"))
        .await
        .unwrap();
    a.close().await.unwrap();

    let mut session = StreamSession::new(b, Chunker::batch());
    assert!(matches!(
        session.receive_envelope().await,
        Err(EnvelopeError::CorruptEnvelope(_))
    ));
    assert_eq!(session.metrics().decode_failures, 1);
}

#[tokio::test]
async fn test_connect_refused_is_error() {
    // Bind then drop to obtain a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    assert!(TcpChannel::connect(&addr).await.is_err());
}

#[tokio::test]
async fn test_sequential_envelopes_on_fresh_channels() {
    let sender = orchestrator(HandlerMode::Stream, 32);
    for i in 0..3 {
        let (a, b) = MemoryChannel::pair(64);
        let value = json!({"seq": i});
        let envelope = sender.encode(&value).unwrap();

        let mut out = StreamSession::new(a, *sender.chunker());
        out.send_envelope(&envelope).await.unwrap();
        out.close().await.unwrap();

        let mut inbound = StreamSession::new(b, Chunker::batch());
        let received = inbound.receive_envelope().await.unwrap();
        assert_eq!(sender.decode(&received, true).unwrap(), value);
    }
}
