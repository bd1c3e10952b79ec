#![no_main]

use envelope_protocol::core::envelope::{Envelope, Header};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = Header::parse(data);

    // Anything that parses must survive a serialize/parse cycle
    if let Ok(envelope) = Envelope::from_bytes(data) {
        let _ = envelope.decode();
        if let Ok(bytes) = envelope.to_bytes() {
            let reparsed = Envelope::from_bytes(&bytes).expect("serialized envelope must parse");
            assert_eq!(reparsed, envelope);
        }
    }
});
