use envelope_protocol::config::HandlerMode;
use envelope_protocol::protocol::reassembly::Reassembler;
use envelope_protocol::service::{EncodeOptions, Orchestrator};
use envelope_protocol::utils::compression::CompressionKind;
use envelope_protocol::json;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_encode_decode_shared_orchestrator() {
    use std::sync::Arc;
    use tokio::task::JoinSet;

    let iterations = 500usize;
    let orchestrator = Arc::new(
        Orchestrator::builder()
            .schema(json!({"type": "object", "required": ["task", "i"]}))
            .handler(HandlerMode::Stream, 48)
            .build()
            .unwrap(),
    );

    let mut tasks = JoinSet::new();
    for task in 0..8u32 {
        let orchestrator = orchestrator.clone();
        tasks.spawn(async move {
            // One reassembler per task, never shared
            let mut reassembler = Reassembler::new();
            for i in 0..iterations {
                let value = json!({"task": task, "i": i, "pad": "z".repeat(i % 97)});
                let options = EncodeOptions::new(task)
                    .compression(if i % 2 == 0 { Some(CompressionKind::Zstd) } else { None })
                    .encrypt(i % 3 == 0);
                let envelope = orchestrator.encode_with(&value, options).unwrap();

                for chunk in orchestrator.to_chunks(&envelope).unwrap() {
                    reassembler.push(&chunk).unwrap();
                }
                reassembler.finish().unwrap();
                let received = reassembler.take_envelope().unwrap();

                assert_eq!(received.schema_id(), task);
                assert_eq!(orchestrator.decode(&received, i % 3 == 0).unwrap(), value);
            }
        });
    }

    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }

    let metrics = orchestrator.metrics();
    assert_eq!(metrics.envelopes_encoded, 8 * iterations as u64);
    assert_eq!(metrics.envelopes_decoded, 8 * iterations as u64);
    assert_eq!(metrics.decode_failures, 0);
}
