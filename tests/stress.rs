use envelope_protocol::core::chunker::Chunker;
use envelope_protocol::core::envelope::Envelope;
use envelope_protocol::json;
use envelope_protocol::protocol::reassembly::{to_chunks, Reassembler};

#[test]
fn stress_envelope_chunk_reassemble_large_series() {
    // Heavy burst of envelopes through one reassembler, no panics and no leaks between streams
    let mut reassembler = Reassembler::new();

    for size in [0usize, 1, 64, 512, 4096, 65536, 1_048_576] {
        let value = json!({"blob": "q".repeat(size)});
        let envelope = Envelope::encode(&value, size as u32, size % 2 == 0).unwrap();

        for chunk_size in [1usize, 7, 1024, 1 << 20] {
            if chunk_size == 1 && size > 4096 {
                continue;
            }
            let chunker = Chunker::stream(chunk_size).unwrap();
            for _ in 0..5 {
                for chunk in to_chunks(&envelope, &chunker).unwrap() {
                    reassembler.push(&chunk).unwrap();
                }
                reassembler.finish().unwrap();
                assert_eq!(reassembler.envelope().unwrap(), &envelope);
            }
        }
        assert_eq!(reassembler.take_envelope().unwrap().decode().unwrap(), value);
    }
}
