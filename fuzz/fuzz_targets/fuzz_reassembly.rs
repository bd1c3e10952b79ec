#![no_main]

use envelope_protocol::protocol::reassembly::{Reassembler, StreamState};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First byte picks the chunk size, the rest is the inbound stream
    let Some((&size, stream)) = data.split_first() else {
        return;
    };
    let chunk_size = usize::from(size).max(1);

    let mut reassembler = Reassembler::new();
    for chunk in stream.chunks(chunk_size) {
        let _ = reassembler.push(chunk);
    }
    if reassembler.finish().ok() == Some(StreamState::Ready) {
        let _ = reassembler.envelope().map(|e| e.decode());
    }
});
