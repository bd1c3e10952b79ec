//! # Utility Modules
//!
//! Supporting utilities for sealing, compression, logging, and timing.
//!
//! ## Components
//! - **Crypto**: AES-256-GCM payload sealing and HMAC-SHA256 signatures
//! - **Compression**: Zstd and LZ4 with a decompressed-size ceiling
//! - **Logging**: Structured logging configuration
//! - **Metrics**: Thread-safe pipeline counters
//! - **Time**: Epoch-millisecond timestamps for metadata
//! - **Timeout**: Deadline wrappers for receive loops
//!
//! ## Security
//! - Cryptographically secure RNG (getrandom) for keys and IVs
//! - Decompression bomb protection (16MB limit)
//! - Memory zeroing for key material (zeroize crate)

pub mod compression;
pub mod crypto;
pub mod logging;
pub mod metrics;
pub mod time;
pub mod timeout;
