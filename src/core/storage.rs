//! Envelope persistence in the wire layout.

use crate::core::envelope::Envelope;
use crate::error::Result;
use std::path::Path;
use tracing::{debug, instrument};

/// Write `envelope` to `path`, replacing any existing file
#[instrument(skip(envelope, path), fields(path = %path.as_ref().display()))]
pub fn save_to_file<P: AsRef<Path>>(envelope: &Envelope, path: P) -> Result<()> {
    let bytes = envelope.to_bytes()?;
    std::fs::write(&path, &bytes)?;
    debug!(bytes = bytes.len(), "Envelope written");
    Ok(())
}

/// Read an envelope previously written by [`save_to_file`]
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Envelope> {
    let bytes = std::fs::read(&path)?;
    debug!(bytes = bytes.len(), "Envelope read");
    Envelope::from_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::error::EnvelopeError;
    use serde_json::json;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");

        let envelope = Envelope::encode(&json!({"id": 1, "name": "Alice", "age": 30}), 1, true)
            .unwrap();
        save_to_file(&envelope, &path).unwrap();

        let loaded = load_from_file(&path).unwrap();
        assert_eq!(loaded, envelope);
        assert_eq!(loaded.decode().unwrap()["name"], "Alice");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_from_file(dir.path().join("absent.bin"));
        assert!(matches!(result, Err(EnvelopeError::Io(_))));
    }
}
