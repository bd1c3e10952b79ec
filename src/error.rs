//! # Error Types
//!
//! Error handling for envelope encoding, sealing and chunked delivery.
//!
//! Every fallible operation in the crate returns [`Result`], whose error side is
//! [`EnvelopeError`]. Validation and decode errors abort the current call and are
//! surfaced to the caller; nothing in this crate retries on its own.
//!
//! ## Error Categories
//! - **Schema**: a value failed rule validation (carries every violation)
//! - **Security**: sealing, opening or signature verification failed
//! - **Network**: the channel is not open or failed underneath us
//! - **Corrupt envelope**: malformed header, metadata or payload bytes
//! - **Not ready**: a reassembled envelope was requested too early
//!
//! ## Example Usage
//! ```rust
//! use envelope_protocol::error::{EnvelopeError, Result};
//! use tracing::{error, info};
//!
//! fn read_envelope(path: &str) -> Result<Vec<u8>> {
//!     std::fs::read(path).map_err(EnvelopeError::Io)
//! }
//!
//! match read_envelope("missing.bj") {
//!     Ok(bytes) => info!(len = bytes.len(), "Loaded envelope"),
//!     Err(e) => error!(error = %e, "Failed to load envelope"),
//! }
//! ```

use crate::protocol::schema::Violation;
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Envelope layout errors
    pub const ERR_SHORT_HEADER: &str = "Envelope shorter than header and metadata length";
    pub const ERR_BAD_MAGIC: &str = "Invalid magic tag";
    pub const ERR_SCHEMA_MISMATCH: &str = "Header schema id does not match metadata";
    pub const ERR_TRUNCATED_METADATA: &str = "Metadata truncated";
    pub const ERR_OVERSIZED_METADATA: &str = "Metadata length exceeds maximum";
    pub const ERR_OVERSIZED_PAYLOAD: &str = "Stream payload exceeds maximum";
    pub const ERR_TRAILING_BYTES: &str = "Trailing bytes after encoded value";

    /// Cryptographic errors
    pub const ERR_ENCRYPTION_FAILED: &str = "Encryption failed";
    pub const ERR_DECRYPTION_FAILED: &str = "Decryption failed";
    pub const ERR_SEALED_TOO_SHORT: &str = "Sealed payload shorter than IV";
    pub const ERR_SIGNATURE_MISMATCH: &str = "Signature does not match";
    pub const ERR_RANDOM_SOURCE: &str = "Random source unavailable";

    /// Compression errors
    pub const ERR_COMPRESSION_FAILED: &str = "Compression failed";
    pub const ERR_DECOMPRESSION_FAILED: &str = "Decompression failed";

    /// Channel errors
    pub const ERR_CHANNEL_NOT_OPEN: &str = "Channel is not open";
    pub const ERR_PEER_GONE: &str = "Peer dropped its end of the channel";
    pub const ERR_SEND_TIMEOUT: &str = "Send timed out";
    pub const ERR_FRAME_TOO_LARGE: &str = "Chunk exceeds channel frame limit";
}

/// Primary error type for all envelope operations
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Schema validation failed: {}", format_violations(.violations))]
    Schema { violations: Vec<Violation> },

    #[error("Security error: {0}")]
    Security(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt envelope: {0}")]
    CorruptEnvelope(String),

    #[error("Envelope not ready: stream has not completed")]
    NotReady,

    #[error("Chunk too large: {0} bytes")]
    OversizedChunk(usize),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout occurred")]
    Timeout,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EnvelopeError {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        EnvelopeError::CorruptEnvelope(msg.into())
    }

    pub(crate) fn security(msg: impl Into<String>) -> Self {
        EnvelopeError::Security(msg.into())
    }

    pub(crate) fn network(msg: impl Into<String>) -> Self {
        EnvelopeError::Network(msg.into())
    }

    /// Violations carried by a schema failure, empty for every other variant
    pub fn violations(&self) -> &[Violation] {
        match self {
            EnvelopeError::Schema { violations } => violations,
            _ => &[],
        }
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Type alias for Results using EnvelopeError
pub type Result<T> = std::result::Result<T, EnvelopeError>;
