//! # Value Serialization
//!
//! Canonical byte encoding for structured values and metadata maps.
//!
//! Values are `serde_json::Value` trees: a tagged variant of null, bool,
//! number (i64, u64 and f64 kept distinct), string, array and object. Objects
//! keep insertion order (`preserve_order`), so a round trip reproduces key
//! order as well as content.
//!
//! The wire encoding is MessagePack via `rmp-serde`. Decoding must consume the
//! whole input; leftover bytes mean the payload is not what the metadata claims.

use crate::error::{constants, EnvelopeError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::io::Cursor;

/// Encode a value to MessagePack
pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
    rmp_serde::to_vec(value).map_err(|e| EnvelopeError::Serialization(e.to_string()))
}

/// Decode a MessagePack value, rejecting trailing bytes
pub fn decode_value(bytes: &[u8]) -> Result<Value> {
    let mut cursor = Cursor::new(bytes);
    let value = {
        let mut de = rmp_serde::Deserializer::new(&mut cursor);
        Value::deserialize(&mut de).map_err(|e| EnvelopeError::corrupt(e.to_string()))?
    };

    if cursor.position() as usize != bytes.len() {
        return Err(EnvelopeError::corrupt(constants::ERR_TRAILING_BYTES));
    }
    Ok(value)
}
