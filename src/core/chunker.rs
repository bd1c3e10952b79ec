//! # Chunker
//!
//! Splits a serialized envelope into the ordered pieces handed to a channel.
//!
//! Batch mode is the identity chunking: one piece holding the whole input.
//! Stream mode yields `chunk_size` slices with a shorter final slice. Slices
//! share the input buffer (`Bytes::slice`), so chunking never copies.

use crate::config::{HandlerConfig, HandlerMode};
use crate::error::{EnvelopeError, Result};
use bytes::Bytes;

/// Stateless, deterministic splitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    mode: HandlerMode,
    chunk_size: usize,
}

impl Chunker {
    /// `chunk_size` must be positive in either mode
    pub fn new(mode: HandlerMode, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(EnvelopeError::Config(
                "Chunk size must be greater than 0".to_string(),
            ));
        }
        Ok(Self { mode, chunk_size })
    }

    pub fn batch() -> Self {
        Self {
            mode: HandlerMode::Batch,
            chunk_size: crate::config::DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn stream(chunk_size: usize) -> Result<Self> {
        Self::new(HandlerMode::Stream, chunk_size)
    }

    pub fn from_config(config: &HandlerConfig) -> Result<Self> {
        Self::new(config.mode, config.chunk_size)
    }

    pub fn mode(&self) -> HandlerMode {
        self.mode
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Split `data` according to the configured mode
    pub fn process(&self, data: impl Into<Bytes>) -> Vec<Bytes> {
        let data = data.into();
        match self.mode {
            HandlerMode::Batch => vec![data],
            HandlerMode::Stream => (0..data.len())
                .step_by(self.chunk_size)
                .map(|start| data.slice(start..(start + self.chunk_size).min(data.len())))
                .collect(),
        }
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::batch()
    }
}

/// One-shot form of [`Chunker::process`]
pub fn process(data: impl Into<Bytes>, mode: HandlerMode, chunk_size: usize) -> Result<Vec<Bytes>> {
    Ok(Chunker::new(mode, chunk_size)?.process(data))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_stream_chunk_lengths() {
        let chunks = process(vec![0u8; 2000], HandlerMode::Stream, 512).unwrap();
        let lengths: Vec<_> = chunks.iter().map(Bytes::len).collect();
        assert_eq!(lengths, vec![512, 512, 512, 464]);
    }

    #[test]
    fn test_exact_multiple_has_no_short_tail() {
        let chunks = process(vec![1u8; 1024], HandlerMode::Stream, 256).unwrap();
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.len() == 256));
    }

    #[test]
    fn test_batch_is_identity() {
        let data = Bytes::from_static(b"whole envelope");
        let chunks = process(data.clone(), HandlerMode::Batch, 4).unwrap();
        assert_eq!(chunks, vec![data]);
    }

    #[test]
    fn test_zero_chunk_size_is_config_error() {
        assert!(matches!(
            process(vec![1u8], HandlerMode::Stream, 0),
            Err(EnvelopeError::Config(_))
        ));
        assert!(Chunker::new(HandlerMode::Batch, 0).is_err());
    }

    #[test]
    fn test_empty_input_streams_no_chunks() {
        assert!(process(Vec::new(), HandlerMode::Stream, 8).unwrap().is_empty());
    }

    #[test]
    fn test_chunks_concatenate_to_input() {
        let data: Vec<u8> = (0..=255).cycle().take(1000).collect();
        let joined: Vec<u8> = process(data.clone(), HandlerMode::Stream, 33)
            .unwrap()
            .concat();
        assert_eq!(joined, data);
    }
}
