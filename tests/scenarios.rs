#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end pipeline scenarios through the orchestrator

use envelope_protocol::config::{EnvelopeConfig, HandlerMode};
use envelope_protocol::core::chunker::process;
use envelope_protocol::error::EnvelopeError;
use envelope_protocol::protocol::reassembly::{Reassembler, StreamState};
use envelope_protocol::service::{EncodeOptions, Orchestrator};
use envelope_protocol::utils::compression::CompressionKind;
use envelope_protocol::utils::crypto::SecurityManager;
use envelope_protocol::{json, Value};

fn person_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "name": {"type": "string"}
        },
        "required": ["id", "name"]
    })
}

fn alice() -> Value {
    json!({"id": 1, "name": "Alice"})
}

#[test]
fn scenario_compressed_plain_roundtrip() {
    let orchestrator = Orchestrator::builder()
        .schema(person_schema())
        .compression(Some(CompressionKind::Zstd))
        .encrypt(false)
        .build()
        .unwrap();

    let envelope = orchestrator.encode(&alice()).unwrap();
    assert_eq!(envelope.metadata().compression_tag(), "zstd");
    assert_eq!(orchestrator.decode(&envelope, false).unwrap(), alice());
}

#[test]
fn scenario_sealed_roundtrip_requires_decrypt() {
    let orchestrator = Orchestrator::builder()
        .schema(person_schema())
        .encrypt(true)
        .build()
        .unwrap();

    let envelope = orchestrator.encode(&alice()).unwrap();
    assert_eq!(orchestrator.decode(&envelope, true).unwrap(), alice());

    // Sealed bytes are not a zstd frame
    assert!(matches!(
        orchestrator.decode(&envelope, false),
        Err(EnvelopeError::CorruptEnvelope(_))
    ));

    let metrics = orchestrator.metrics();
    assert_eq!(metrics.encryption_total, 1);
    assert_eq!(metrics.envelopes_decoded, 1);
    assert_eq!(metrics.decode_failures, 1);
}

#[test]
fn scenario_stream_mode_chunk_lengths() {
    let chunks = process(vec![0xAAu8; 2000], HandlerMode::Stream, 512).unwrap();
    let lengths: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
    assert_eq!(lengths, vec![512, 512, 512, 464]);
}

#[test]
fn scenario_short_sealed_payload_is_security_error() {
    let security = SecurityManager::generate().unwrap();
    assert!(matches!(
        security.decrypt([0u8; 15]),
        Err(EnvelopeError::Security(_))
    ));
}

#[test]
fn scenario_out_of_order_chunks_do_not_match() {
    let orchestrator = Orchestrator::builder()
        .compression(None)
        .handler(HandlerMode::Stream, 24)
        .build()
        .unwrap();

    let value = json!({"log": (0..120).map(|i| format!("line-{i}")).collect::<Vec<_>>()});
    let envelope = orchestrator.encode(&value).unwrap();
    let mut chunks = orchestrator.to_chunks(&envelope).unwrap();
    let n = chunks.len();
    chunks.swap(n - 2, n - 4);

    let mut reassembler = Reassembler::new();
    for chunk in &chunks {
        reassembler.push(chunk).unwrap();
    }
    assert_eq!(reassembler.finish().unwrap(), StreamState::Ready);

    let received = reassembler.envelope().unwrap();
    assert_ne!(received.payload(), envelope.payload());
    assert_ne!(orchestrator.decode(received, false).ok(), Some(value));
}

#[test]
fn scenario_schema_gating_before_encoding() {
    let orchestrator = Orchestrator::builder()
        .schema(person_schema())
        .encrypt(true)
        .build()
        .unwrap();

    let err = orchestrator.encode(&json!({"id": 1})).unwrap_err();
    let violations = err.violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].path, "/name");

    let metrics = orchestrator.metrics();
    assert_eq!(metrics.validation_failures, 1);
    assert_eq!(metrics.envelopes_encoded, 0);
    assert_eq!(metrics.compression_total, 0);
    assert_eq!(metrics.encryption_total, 0);
}

#[test]
fn scenario_config_file_drives_pipeline() {
    let toml = r#"
        [codec]
        schema_id = 30
        compress = true
        algorithm = "lz4"
        compression_level = 3

        [security]
        encrypt = true
        key_hex = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f"

        [handler]
        mode = "stream"
        chunk_size = 64

        [transport]
        address = "127.0.0.1:9400"
        connect_timeout = 5000
        send_timeout = 5000
        queue_capacity = 64
        max_frame_size = 1048576

        [logging]
        app_name = "scenarios"
        log_level = "info"
        json_format = false
    "#;
    let config = EnvelopeConfig::from_toml(toml).unwrap();
    let sender = Orchestrator::new(&config).unwrap();
    let receiver = Orchestrator::new(&config).unwrap();

    let value = json!({"reading": 21.5, "unit": "C"});
    let envelope = sender.encode(&value).unwrap();
    assert_eq!(envelope.schema_id(), 30);
    assert_eq!(envelope.metadata().compression_tag(), "lz4");

    // Shared key: the receiver opens what the sender sealed
    assert_eq!(receiver.decode(&envelope, true).unwrap(), value);
    let signature = sender.sign(&envelope).unwrap();
    assert!(receiver.verify(&envelope, &signature).is_ok());
}

#[test]
fn scenario_per_call_options_override_defaults() {
    let orchestrator = Orchestrator::builder().schema_id(10).build().unwrap();
    let value = json!([1, 2, 3]);

    let envelope = orchestrator
        .encode_with(
            &value,
            EncodeOptions::new(11)
                .compression(Some(CompressionKind::Lz4))
                .encrypt(true),
        )
        .unwrap();
    assert_eq!(envelope.schema_id(), 11);
    assert_eq!(envelope.metadata().compression_tag(), "lz4");
    assert_eq!(orchestrator.decode(&envelope, true).unwrap(), value);
}
