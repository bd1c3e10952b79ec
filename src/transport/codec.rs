//! Length-prefixed framing for chunks over byte streams
//!
//! ```text
//! [Length(4, big-endian)] [Chunk(N)]
//! ```
//!
//! TCP has no message boundaries, so each chunk is framed on the way out
//! and unframed on the way in. The length is checked against the
//! configured maximum before any allocation.

use crate::config::MAX_FRAME_SIZE;
use crate::error::{EnvelopeError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

const LENGTH_PREFIX: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct ChunkCodec {
    max_frame_size: usize,
}

impl ChunkCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for ChunkCodec {
    fn default() -> Self {
        Self::new(MAX_FRAME_SIZE)
    }
}

impl Decoder for ChunkCodec {
    type Item = Bytes;
    type Error = EnvelopeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.len() < LENGTH_PREFIX {
            return Ok(None);
        }

        let mut prefix = [0u8; LENGTH_PREFIX];
        prefix.copy_from_slice(&src[..LENGTH_PREFIX]);
        let len = u32::from_be_bytes(prefix) as usize;

        if len > self.max_frame_size {
            return Err(EnvelopeError::OversizedChunk(len));
        }

        let total = LENGTH_PREFIX + len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX);
        Ok(Some(src.split_to(len).freeze()))
    }
}

impl Encoder<Bytes> for ChunkCodec {
    type Error = EnvelopeError;

    fn encode(&mut self, chunk: Bytes, dst: &mut BytesMut) -> Result<()> {
        if chunk.len() > self.max_frame_size || chunk.len() > u32::MAX as usize {
            return Err(EnvelopeError::OversizedChunk(chunk.len()));
        }

        dst.reserve(LENGTH_PREFIX + chunk.len());
        dst.put_u32(chunk.len() as u32);
        dst.extend_from_slice(&chunk);
        Ok(())
    }
}
