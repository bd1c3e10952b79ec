use crate::config::MAX_PAYLOAD_SIZE;
use crate::error::{EnvelopeError, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Compression algorithms an envelope payload may carry
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionKind {
    Lz4,
    Zstd,
}

impl CompressionKind {
    /// Tag written into envelope metadata
    pub fn tag(self) -> &'static str {
        match self {
            CompressionKind::Lz4 => "lz4",
            CompressionKind::Zstd => "zstd",
        }
    }

    /// Inverse of [`CompressionKind::tag`]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "lz4" => Some(CompressionKind::Lz4),
            "zstd" => Some(CompressionKind::Zstd),
            _ => None,
        }
    }
}

/// Maximum output size for decompression (align with MAX_PAYLOAD_SIZE to prevent DoS)
const MAX_DECOMPRESSION_SIZE: usize = MAX_PAYLOAD_SIZE;

/// Default zstd level when the caller has no preference
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// Compresses data using the specified compression algorithm
///
/// # Errors
/// Returns `EnvelopeError::CorruptEnvelope` if compression fails
pub fn compress(data: &[u8], kind: CompressionKind) -> Result<Vec<u8>> {
    compress_with_level(data, kind, DEFAULT_ZSTD_LEVEL)
}

/// Like [`compress`] with an explicit zstd level; lz4 ignores the level
pub fn compress_with_level(data: &[u8], kind: CompressionKind, level: i32) -> Result<Vec<u8>> {
    match kind {
        CompressionKind::Lz4 => Ok(lz4_flex::compress_prepend_size(data)),
        CompressionKind::Zstd => {
            let mut out = Vec::new();
            zstd::stream::copy_encode(data, &mut out, level).map_err(|e| {
                EnvelopeError::corrupt(format!(
                    "{}: {e}",
                    crate::error::constants::ERR_COMPRESSION_FAILED
                ))
            })?;
            Ok(out)
        }
    }
}

/// Decompresses data that was compressed with the specified algorithm
///
/// Output is capped at MAX_PAYLOAD_SIZE so a forged size prefix or a
/// decompression bomb cannot exhaust memory.
///
/// # Errors
/// Returns `EnvelopeError::CorruptEnvelope` if:
/// - Decompression fails
/// - Output size exceeds MAX_DECOMPRESSION_SIZE
pub fn decompress(data: &[u8], kind: CompressionKind) -> Result<Vec<u8>> {
    let failed = || EnvelopeError::corrupt(crate::error::constants::ERR_DECOMPRESSION_FAILED);

    match kind {
        CompressionKind::Lz4 => {
            // lz4_flex prepends the uncompressed size as 4 little-endian bytes;
            // check it before lz4_flex allocates.
            if data.len() < 4 {
                return Err(failed());
            }

            let claimed_size = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
            if claimed_size > MAX_DECOMPRESSION_SIZE {
                return Err(failed());
            }

            let decompressed = lz4_flex::decompress_size_prepended(data).map_err(|_| failed())?;
            if decompressed.len() > MAX_DECOMPRESSION_SIZE {
                return Err(failed());
            }
            Ok(decompressed)
        }
        CompressionKind::Zstd => {
            let mut out = Vec::new();
            let mut reader = zstd::stream::Decoder::new(data).map_err(|_| failed())?;

            // Read in chunks to enforce size limit
            let mut buffer = [0u8; 8192];
            loop {
                match reader.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(n) => {
                        out.extend_from_slice(&buffer[..n]);
                        if out.len() > MAX_DECOMPRESSION_SIZE {
                            return Err(failed());
                        }
                    }
                    Err(_) => return Err(failed()),
                }
            }
            Ok(out)
        }
    }
}
