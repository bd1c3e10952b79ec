//! # Envelope
//!
//! The unit of exchange: a fixed header, a metadata map and an opaque payload.
//!
//! ## Wire Format
//! ```text
//! [Magic(2)] [SchemaId(4, BE)] [MetadataLen(4, BE)] [Metadata(M)] [Payload(N)]
//! ```
//!
//! The schema id appears twice: in the header, so inbound streams can be routed
//! or filtered by schema without decoding metadata, and in the metadata map.
//! Parsers reject envelopes where the two disagree.
//!
//! Payload interpretation follows `metadata.compression`. Whether the payload
//! has additionally been sealed is tracked by the caller, not by the envelope.

use crate::config::{MAGIC_BYTES, MAX_METADATA_SIZE};
use crate::core::serialization::{decode_value, encode_value};
use crate::error::{constants, EnvelopeError, Result};
use crate::utils::compression::{self, CompressionKind, DEFAULT_ZSTD_LEVEL};
use crate::utils::time::now_millis;
use bytes::Bytes;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

/// Size of the magic tag plus schema id
pub const HEADER_LEN: usize = 6;

/// Header plus the metadata length field
pub const PREFIX_LEN: usize = HEADER_LEN + 4;

const KEY_SCHEMA_ID: &str = "schema_id";
const KEY_TIMESTAMP: &str = "timestamp";
const KEY_COMPRESSION: &str = "compression";

/// Metadata tag for uncompressed payloads
pub const COMPRESSION_NONE: &str = "none";

/// The 6-byte envelope header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    schema_id: u32,
}

impl Header {
    pub fn new(schema_id: u32) -> Self {
        Self { schema_id }
    }

    pub fn schema_id(&self) -> u32 {
        self.schema_id
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..2].copy_from_slice(&MAGIC_BYTES);
        out[2..].copy_from_slice(&self.schema_id.to_be_bytes());
        out
    }

    /// Parse the leading header of `bytes`, ignoring anything after it
    ///
    /// Cheap enough to route inbound envelopes by schema before decoding metadata.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(EnvelopeError::corrupt(constants::ERR_SHORT_HEADER));
        }
        if bytes[..2] != MAGIC_BYTES {
            return Err(EnvelopeError::corrupt(constants::ERR_BAD_MAGIC));
        }
        let schema_id = u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
        Ok(Self { schema_id })
    }
}

/// Parse header and metadata length from the first [`PREFIX_LEN`] bytes
///
/// The declared metadata length is bounded by `MAX_METADATA_SIZE`.
pub fn parse_prefix(bytes: &[u8]) -> Result<(Header, usize)> {
    if bytes.len() < PREFIX_LEN {
        return Err(EnvelopeError::corrupt(constants::ERR_SHORT_HEADER));
    }
    let header = Header::parse(bytes)?;
    let metadata_len = u32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;
    if metadata_len > MAX_METADATA_SIZE {
        return Err(EnvelopeError::corrupt(format!(
            "{}: {metadata_len} bytes",
            constants::ERR_OVERSIZED_METADATA
        )));
    }
    Ok((header, metadata_len))
}

/// Ordered metadata map carried by every envelope
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    schema_id: u32,
    timestamp: u64,
    compression: Option<CompressionKind>,
    extra: Map<String, Value>,
}

impl Metadata {
    pub fn new(schema_id: u32, timestamp: u64, compression: Option<CompressionKind>) -> Self {
        Self {
            schema_id,
            timestamp,
            compression,
            extra: Map::new(),
        }
    }

    pub fn schema_id(&self) -> u32 {
        self.schema_id
    }

    /// Milliseconds since the Unix epoch at construction
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// `None` when the payload is stored uncompressed
    pub fn compression(&self) -> Option<CompressionKind> {
        self.compression
    }

    pub fn compression_tag(&self) -> &'static str {
        self.compression.map_or(COMPRESSION_NONE, CompressionKind::tag)
    }

    /// Keys beyond the three required ones, in insertion order
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            KEY_SCHEMA_ID => Some(Value::from(self.schema_id)),
            KEY_TIMESTAMP => Some(Value::from(self.timestamp)),
            KEY_COMPRESSION => Some(Value::from(self.compression_tag())),
            other => self.extra.get(other).cloned(),
        }
    }

    fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(3 + self.extra.len());
        map.insert(KEY_SCHEMA_ID.to_string(), Value::from(self.schema_id));
        map.insert(KEY_TIMESTAMP.to_string(), Value::from(self.timestamp));
        map.insert(
            KEY_COMPRESSION.to_string(),
            Value::from(self.compression_tag()),
        );
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }

    /// MessagePack encoding of the metadata map
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_value(&self.to_value())
    }

    /// Decode a metadata map, checking required keys and the compression tag
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let Value::Object(map) = decode_value(bytes)? else {
            return Err(EnvelopeError::corrupt("Metadata is not a map"));
        };

        let mut schema_id = None;
        let mut timestamp = None;
        let mut compression = None;
        let mut extra = Map::new();

        for (key, value) in map {
            match key.as_str() {
                KEY_SCHEMA_ID => {
                    schema_id = value.as_u64().and_then(|id| u32::try_from(id).ok());
                    if schema_id.is_none() {
                        return Err(EnvelopeError::corrupt("schema_id is not a u32"));
                    }
                }
                KEY_TIMESTAMP => {
                    timestamp = value.as_u64();
                    if timestamp.is_none() {
                        return Err(EnvelopeError::corrupt("timestamp is not an unsigned integer"));
                    }
                }
                KEY_COMPRESSION => {
                    let tag = value
                        .as_str()
                        .ok_or_else(|| EnvelopeError::corrupt("compression is not a string"))?;
                    compression = Some(parse_compression_tag(tag)?);
                }
                _ => {
                    extra.insert(key, value);
                }
            }
        }

        let missing = |key: &str| EnvelopeError::corrupt(format!("Metadata missing '{key}'"));
        Ok(Self {
            schema_id: schema_id.ok_or_else(|| missing(KEY_SCHEMA_ID))?,
            timestamp: timestamp.ok_or_else(|| missing(KEY_TIMESTAMP))?,
            compression: compression.ok_or_else(|| missing(KEY_COMPRESSION))?,
            extra,
        })
    }
}

fn parse_compression_tag(tag: &str) -> Result<Option<CompressionKind>> {
    if tag == COMPRESSION_NONE {
        return Ok(None);
    }
    CompressionKind::from_tag(tag)
        .map(Some)
        .ok_or_else(|| EnvelopeError::corrupt(format!("Unrecognized compression tag '{tag}'")))
}

/// Header + metadata + payload
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    header: Header,
    metadata: Metadata,
    payload: Bytes,
}

impl Envelope {
    /// Encode `value`, compressing with zstd when `compress` is set
    pub fn encode(value: &Value, schema_id: u32, compress: bool) -> Result<Self> {
        let compression = compress.then_some(CompressionKind::Zstd);
        Self::encode_with(value, schema_id, compression, DEFAULT_ZSTD_LEVEL)
    }

    /// Encode `value` with an explicit compression choice
    #[instrument(skip(value), level = "debug")]
    pub fn encode_with(
        value: &Value,
        schema_id: u32,
        compression: Option<CompressionKind>,
        level: i32,
    ) -> Result<Self> {
        let encoded = encode_value(value)?;
        let payload = match compression {
            Some(kind) => compression::compress_with_level(&encoded, kind, level)?,
            None => encoded,
        };

        let metadata = Metadata::new(schema_id, now_millis()?, compression);
        debug!(
            schema_id,
            payload_len = payload.len(),
            compression = metadata.compression_tag(),
            "Encoded envelope"
        );

        Ok(Self {
            header: Header::new(schema_id),
            metadata,
            payload: Bytes::from(payload),
        })
    }

    /// Assemble an envelope from already-parsed parts
    pub fn from_parts(header: Header, metadata: Metadata, payload: impl Into<Bytes>) -> Result<Self> {
        if header.schema_id() != metadata.schema_id() {
            return Err(EnvelopeError::corrupt(format!(
                "{}: header {} vs metadata {}",
                constants::ERR_SCHEMA_MISMATCH,
                header.schema_id(),
                metadata.schema_id()
            )));
        }
        Ok(Self {
            header,
            metadata,
            payload: payload.into(),
        })
    }

    /// Add an extra metadata key; the three required keys cannot be overridden
    pub fn with_extra_metadata(mut self, key: impl Into<String>, value: Value) -> Result<Self> {
        let key = key.into();
        if matches!(key.as_str(), KEY_SCHEMA_ID | KEY_TIMESTAMP | KEY_COMPRESSION) {
            return Err(EnvelopeError::Config(format!(
                "Metadata key '{key}' is reserved"
            )));
        }
        self.metadata.extra.insert(key, value);
        Ok(self)
    }

    /// Recover the value: decompress per metadata, then deserialize
    pub fn decode(&self) -> Result<Value> {
        match self.metadata.compression {
            Some(kind) => decode_value(&compression::decompress(&self.payload, kind)?),
            None => decode_value(&self.payload),
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn schema_id(&self) -> u32 {
        self.header.schema_id
    }

    /// Swap the payload, e.g. for its sealed form
    pub fn replace_payload(&mut self, payload: impl Into<Bytes>) {
        self.payload = payload.into();
    }

    /// Serialize to the wire layout
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let metadata = self.metadata.encode()?;
        if metadata.len() > MAX_METADATA_SIZE {
            return Err(EnvelopeError::corrupt(format!(
                "{}: {} bytes",
                constants::ERR_OVERSIZED_METADATA,
                metadata.len()
            )));
        }

        let mut out = Vec::with_capacity(PREFIX_LEN + metadata.len() + self.payload.len());
        out.extend_from_slice(&self.header.to_bytes());
        out.extend_from_slice(&(metadata.len() as u32).to_be_bytes());
        out.extend_from_slice(&metadata);
        out.extend_from_slice(&self.payload);
        Ok(out)
    }

    /// Parse the wire layout; everything after the metadata is payload
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (header, metadata_len) = parse_prefix(bytes)?;
        let metadata_end = PREFIX_LEN + metadata_len;
        if bytes.len() < metadata_end {
            return Err(EnvelopeError::corrupt(constants::ERR_TRUNCATED_METADATA));
        }

        let metadata = Metadata::decode(&bytes[PREFIX_LEN..metadata_end])?;
        Self::from_parts(
            header,
            metadata,
            Bytes::copy_from_slice(&bytes[metadata_end..]),
        )
    }
}
