//! # Core Envelope Components
//!
//! Envelope layout, value encoding, chunking and persistence.
//!
//! ## Components
//! - **Envelope**: header, metadata map and payload, with compression applied on encode
//! - **Serialization**: canonical MessagePack encoding of structured values
//! - **Chunker**: batch passthrough or fixed-size stream chunking
//! - **Storage**: write/read envelopes in the wire layout
//!
//! ## Wire Format
//! ```text
//! [Magic(2)] [SchemaId(4)] [MetadataLen(4)] [Metadata(M)] [Payload(N)]
//! ```
//!
//! ## Security
//! - Metadata length is bounded (64KB) before any allocation
//! - Decompressed payloads are bounded (16MB)
//! - Magic bytes prevent accidental misinterpretation

pub mod chunker;
pub mod envelope;
pub mod serialization;
pub mod storage;
