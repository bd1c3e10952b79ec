//! Receiver-side reassembly of one envelope from an ordered chunk sequence.
//!
//! ```text
//! Idle ──chunk──▶ HeaderPending ──≥10 bytes + metadata──▶ Accumulating ──finish()──▶ Ready
//!   ▲                                                                                  │
//!   └──────────────────────────── reset() / next chunk ◀────────────────────────────────┘
//! ```
//!
//! Chunks carry no framing. The first ten bytes give the header and the
//! metadata length; once that many metadata bytes have arrived, everything
//! else is payload. There is no end-of-transmission marker, so the caller
//! decides when the stream is over and calls [`Reassembler::finish`].
//!
//! The reassembler performs no reordering, deduplication or gap detection.
//! Out-of-order or dropped chunks yield a corrupt payload, not an error.
//! One instance belongs to one channel and is driven from one task.

use crate::config::MAX_PAYLOAD_SIZE;
use crate::core::chunker::Chunker;
use crate::core::envelope::{parse_prefix, Envelope, Header, Metadata, PREFIX_LEN};
use crate::error::{constants, EnvelopeError, Result};
use crate::utils::crypto::{IV_LEN, TAG_LEN};
use bytes::{Bytes, BytesMut};
use tracing::{debug, trace, warn};

/// Largest payload a stream may accumulate: a full payload plus sealing overhead
pub const MAX_STREAM_PAYLOAD: usize = MAX_PAYLOAD_SIZE + IV_LEN + TAG_LEN;

/// Observable progress of the current stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    /// No chunk seen yet
    #[default]
    Idle,
    /// Header or metadata still incomplete
    HeaderPending,
    /// Metadata parsed; chunks go straight to the payload
    Accumulating,
    /// Envelope reconstructed and readable
    Ready,
}

/// Per-stream buffers
#[derive(Debug, Default)]
struct ReassemblyState {
    /// Bytes seen before the metadata was complete
    buffered: BytesMut,
    header: Option<Header>,
    metadata_len: Option<usize>,
    metadata: Option<Metadata>,
    payload: BytesMut,
    chunks: usize,
}

/// One reassembly state machine per channel
#[derive(Debug, Default)]
pub struct Reassembler {
    phase: StreamState,
    state: ReassemblyState,
    envelope: Option<Envelope>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> StreamState {
        self.phase
    }

    /// Header, available as soon as the first ten bytes have arrived
    pub fn header(&self) -> Option<&Header> {
        self.state.header.as_ref()
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.state.metadata.as_ref()
    }

    /// Payload bytes received so far
    pub fn payload_len(&self) -> usize {
        match &self.envelope {
            Some(envelope) => envelope.payload().len(),
            None => self.state.payload.len(),
        }
    }

    /// Chunks consumed by the current stream
    pub fn chunks_seen(&self) -> usize {
        self.state.chunks
    }

    /// Feed the next inbound chunk
    ///
    /// A chunk arriving in `Ready` starts a new stream. Malformed header or
    /// metadata bytes, or a payload growing past [`MAX_STREAM_PAYLOAD`],
    /// discard the stream and return `CorruptEnvelope`.
    pub fn push(&mut self, chunk: &[u8]) -> Result<StreamState> {
        if self.phase == StreamState::Ready {
            debug!("Chunk after completed stream; starting a new stream");
            self.reset();
        }

        self.state.chunks += 1;
        trace!(len = chunk.len(), chunk = self.state.chunks, state = ?self.phase, "Chunk in");

        if self.phase == StreamState::Accumulating {
            let total = self.state.payload.len().saturating_add(chunk.len());
            if let Err(e) = check_payload_len(total) {
                warn!(payload_len = total, "Discarding oversized stream");
                self.reset();
                return Err(e);
            }
            self.state.payload.extend_from_slice(chunk);
            return Ok(self.phase);
        }

        self.state.buffered.extend_from_slice(chunk);
        self.phase = StreamState::HeaderPending;
        if let Err(e) = self.try_parse_prefix() {
            warn!(error = %e, "Discarding stream with malformed prefix");
            self.reset();
            return Err(e);
        }

        Ok(self.phase)
    }

    fn try_parse_prefix(&mut self) -> Result<()> {
        if self.state.metadata_len.is_none() {
            if self.state.buffered.len() < PREFIX_LEN {
                return Ok(());
            }
            let (header, metadata_len) = parse_prefix(&self.state.buffered)?;
            debug!(schema_id = header.schema_id(), metadata_len, "Header parsed");
            self.state.header = Some(header);
            self.state.metadata_len = Some(metadata_len);
        }

        let (Some(header), Some(metadata_len)) = (self.state.header, self.state.metadata_len)
        else {
            return Ok(());
        };

        let metadata_end = PREFIX_LEN + metadata_len;
        if self.state.buffered.len() < metadata_end {
            return Ok(());
        }

        let metadata = Metadata::decode(&self.state.buffered[PREFIX_LEN..metadata_end])?;
        if metadata.schema_id() != header.schema_id() {
            return Err(EnvelopeError::corrupt(constants::ERR_SCHEMA_MISMATCH));
        }

        check_payload_len(self.state.buffered.len() - metadata_end)?;
        let mut buffered = std::mem::take(&mut self.state.buffered);
        self.state.payload = buffered.split_off(metadata_end);
        self.state.metadata = Some(metadata);
        self.phase = StreamState::Accumulating;
        debug!(
            initial_payload = self.state.payload.len(),
            "Metadata parsed; accumulating payload"
        );
        Ok(())
    }

    /// Declare the stream complete (a caller-observed condition)
    ///
    /// Moves `Accumulating` to `Ready`; any other state is left as is.
    pub fn finish(&mut self) -> Result<StreamState> {
        if self.phase != StreamState::Accumulating {
            return Ok(self.phase);
        }

        let (Some(header), Some(metadata)) = (self.state.header, self.state.metadata.take())
        else {
            return Err(EnvelopeError::NotReady);
        };

        let payload = std::mem::take(&mut self.state.payload).freeze();
        let envelope = Envelope::from_parts(header, metadata, payload)?;
        debug!(
            schema_id = envelope.schema_id(),
            payload_len = envelope.payload().len(),
            chunks = self.state.chunks,
            "Envelope reassembled"
        );
        self.envelope = Some(envelope);
        self.phase = StreamState::Ready;
        Ok(self.phase)
    }

    /// The reconstructed envelope; `NotReady` unless in `Ready`
    pub fn envelope(&self) -> Result<&Envelope> {
        match (&self.phase, &self.envelope) {
            (StreamState::Ready, Some(envelope)) => Ok(envelope),
            _ => Err(EnvelopeError::NotReady),
        }
    }

    /// Hand out the envelope and return to `Idle`
    pub fn take_envelope(&mut self) -> Result<Envelope> {
        if self.phase != StreamState::Ready {
            return Err(EnvelopeError::NotReady);
        }
        let envelope = self.envelope.take().ok_or(EnvelopeError::NotReady)?;
        self.reset();
        Ok(envelope)
    }

    /// Drop any partial or completed stream without error
    pub fn reset(&mut self) {
        if matches!(
            self.phase,
            StreamState::HeaderPending | StreamState::Accumulating
        ) {
            debug!(state = ?self.phase, chunks = self.state.chunks, "Discarding partial stream");
        }
        self.state = ReassemblyState::default();
        self.envelope = None;
        self.phase = StreamState::Idle;
    }
}

fn check_payload_len(len: usize) -> Result<()> {
    if len > MAX_STREAM_PAYLOAD {
        return Err(EnvelopeError::corrupt(format!(
            "{}: {len} bytes",
            constants::ERR_OVERSIZED_PAYLOAD
        )));
    }
    Ok(())
}

/// Send path: serialize `envelope` and split it with `chunker`
pub fn to_chunks(envelope: &Envelope, chunker: &Chunker) -> Result<Vec<Bytes>> {
    Ok(chunker.process(envelope.to_bytes()?))
}
