//! # Envelope Protocol
//!
//! A self-describing binary envelope for structured values, with an optional
//! compression and encryption pipeline and chunked delivery over
//! message-oriented channels.
//!
//! ## Pipeline
//! ```text
//! send:    value ─▶ validate ─▶ encode + compress ─▶ seal ─▶ Envelope ─▶ chunks ─▶ channel
//! receive: channel ─▶ chunks ─▶ reassemble ─▶ Envelope ─▶ open ─▶ decompress + decode ─▶ value
//! ```
//!
//! ## Wire Format
//! ```text
//! [Magic(2) "BJ"] [SchemaId(4, BE)] [MetadataLen(4, BE)] [Metadata(MessagePack)] [Payload]
//! ```
//!
//! ## Modules
//! - [`core`]: envelope layout, value serialization, chunking, file storage
//! - [`protocol`]: schema validation and stream reassembly
//! - [`service`]: the orchestrator and channel sessions
//! - [`transport`]: in-memory and TCP channels
//! - [`utils`]: sealing, compression, logging, metrics, timeouts
//!
//! ## Example
//! ```rust
//! use envelope_protocol::{json, Orchestrator};
//!
//! # fn main() -> envelope_protocol::Result<()> {
//! let orchestrator = Orchestrator::builder()
//!     .schema(json!({
//!         "type": "object",
//!         "properties": {"id": {"type": "integer"}, "name": {"type": "string"}},
//!         "required": ["id", "name"]
//!     }))
//!     .build()?;
//!
//! let value = json!({"id": 1, "name": "Alice"});
//! let envelope = orchestrator.encode(&value)?;
//! assert_eq!(orchestrator.decode(&envelope, false)?, value);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use crate::config::{EnvelopeConfig, HandlerMode};
pub use crate::core::chunker::Chunker;
pub use crate::core::envelope::{Envelope, Header, Metadata};
pub use crate::error::{EnvelopeError, Result};
pub use crate::protocol::reassembly::{Reassembler, StreamState};
pub use crate::protocol::schema::{SchemaValidator, Violation};
pub use serde_json::{json, Value};
pub use crate::service::{EncodeOptions, Orchestrator, StreamSession};
pub use crate::transport::{Channel, MemoryChannel, TcpChannel};
pub use crate::utils::compression::CompressionKind;
pub use crate::utils::crypto::{SealedPayload, SecurityManager};
