//! Example: Envelope round trip over an in-process channel
//!
//! Validates a value, seals it, streams it in chunks over a memory channel,
//! reassembles it on the other side and decodes it again.
//!
//! Run with: `cargo run --example envelope_roundtrip`

use envelope_protocol::config::{EnvelopeConfig, HandlerMode};
use envelope_protocol::core::chunker::Chunker;
use envelope_protocol::service::{Orchestrator, StreamSession};
use envelope_protocol::transport::MemoryChannel;
use envelope_protocol::utils::logging::init_logging;
use envelope_protocol::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = EnvelopeConfig::default_with_overrides(|c| {
        c.codec.schema_id = 7;
        c.codec.schema = Some(json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer"},
                "name": {"type": "string"}
            },
            "required": ["id", "name"]
        }));
        c.security.encrypt = true;
        c.security.key_hex = Some("42".repeat(32));
        c.handler.mode = HandlerMode::Stream;
        c.handler.chunk_size = 16;
        c.logging.app_name = "envelope_roundtrip".into();
    });
    init_logging(&config.logging)?;

    println!("=== Envelope Round Trip Demo ===\n");

    let sender = Orchestrator::new(&config)?;
    let receiver = Orchestrator::new(&config)?;

    // 1. Rejected values never reach the encoder
    match sender.encode(&json!({"id": "one"})) {
        Ok(_) => println!("1. Unexpectedly accepted invalid value"),
        Err(e) => println!("1. Rejected: {e}"),
    }

    // 2. Encode, seal, sign
    let value = json!({"id": 1, "name": "Alice", "tags": ["admin", "ops"]});
    let envelope = sender.encode(&value)?;
    let signature = sender.sign(&envelope)?;
    println!(
        "2. Encoded schema {} ({} payload bytes, compression {})",
        envelope.schema_id(),
        envelope.payload().len(),
        envelope.metadata().compression_tag()
    );

    // 3. Stream it over a channel pair
    let (a, b) = MemoryChannel::pair(64);
    let mut outbound = StreamSession::new(a, *sender.chunker());
    let chunks = outbound.send_envelope(&envelope).await?;
    outbound.close().await?;
    println!("3. Sent {chunks} chunks");

    let mut inbound = StreamSession::new(b, Chunker::batch());
    let received = inbound.receive_envelope().await?;
    receiver.verify(&received, &signature)?;
    println!("4. Reassembled and verified signature");

    // 5. Open and decode
    let decoded = receiver.decode(&received, true)?;
    println!("5. Decoded: {decoded}");
    println!(
        "   Roundtrip: {}",
        if decoded == value { "✓ Success" } else { "✗ Mismatch" }
    );

    Ok(())
}
