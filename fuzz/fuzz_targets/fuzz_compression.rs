#![no_main]

use envelope_protocol::utils::compression::{compress, decompress, CompressionKind};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for kind in [CompressionKind::Lz4, CompressionKind::Zstd] {
        // Round trip must hold for any input
        if let Ok(compressed) = compress(data, kind) {
            assert_eq!(decompress(&compressed, kind).ok().as_deref(), Some(data));
        }

        // Raw decompression of malformed data must respect the size cap
        let _ = decompress(data, kind);
    }
});
