//! Chunked envelope delivery over a [`Channel`]
//!
//! A session pairs one channel with one [`Reassembler`]. Inbound chunks are
//! handled strictly in arrival order by whichever task owns the session;
//! nothing here is shared between channels.

use crate::core::chunker::Chunker;
use crate::core::envelope::Envelope;
use crate::error::{constants, EnvelopeError, Result};
use crate::protocol::reassembly::{to_chunks, Reassembler, StreamState};
use crate::transport::Channel;
use crate::utils::metrics::{Metrics, MetricsSnapshot};
use crate::utils::timeout::with_timeout_error;
use bytes::Bytes;
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub struct StreamSession<C: Channel> {
    channel: C,
    chunker: Chunker,
    reassembler: Reassembler,
    metrics: Metrics,
}

impl<C: Channel> StreamSession<C> {
    pub fn new(channel: C, chunker: Chunker) -> Self {
        Self {
            channel,
            chunker,
            reassembler: Reassembler::new(),
            metrics: Metrics::new(),
        }
    }

    /// Chunk `envelope` and send every piece in order
    ///
    /// # Errors
    /// `EnvelopeError::Network` when the channel is not open or a send fails.
    /// Chunks already sent are not recalled.
    #[instrument(skip(self, envelope), fields(schema_id = envelope.schema_id()))]
    pub async fn send_envelope(&mut self, envelope: &Envelope) -> Result<usize> {
        if !self.channel.is_open() {
            return Err(EnvelopeError::network(constants::ERR_CHANNEL_NOT_OPEN));
        }

        let chunks = to_chunks(envelope, &self.chunker)?;
        let count = chunks.len();
        for chunk in chunks {
            let len = chunk.len() as u64;
            self.channel.send(chunk).await?;
            self.metrics.chunk_sent(len);
        }
        debug!(chunks = count, "Envelope sent");
        Ok(count)
    }

    /// One state transition for one inbound chunk
    pub fn on_message(&mut self, chunk: &[u8]) -> Result<StreamState> {
        self.metrics.chunk_received(chunk.len() as u64);
        self.reassembler.push(chunk).inspect_err(|_| {
            self.metrics.decode_failed();
        })
    }

    /// Read chunks until the peer closes, then return the reassembled envelope
    ///
    /// # Errors
    /// - `EnvelopeError::CorruptEnvelope` for a malformed header or metadata
    /// - `EnvelopeError::NotReady` if the peer closed before the metadata arrived
    pub async fn receive_envelope(&mut self) -> Result<Envelope> {
        while let Some(chunk) = self.channel.recv().await? {
            self.on_message(&chunk)?;
        }

        self.reassembler.finish()?;
        let envelope = self.reassembler.take_envelope().inspect_err(|_| {
            self.metrics.stream_discarded();
            self.reassembler.reset();
        })?;
        self.metrics.envelope_decoded();
        Ok(envelope)
    }

    /// Like [`receive_envelope`](Self::receive_envelope) with a deadline
    ///
    /// On expiry the partial stream is discarded and `Timeout` is returned.
    pub async fn receive_envelope_within(&mut self, deadline: Duration) -> Result<Envelope> {
        let result = with_timeout_error(self.receive_envelope(), deadline).await;
        if matches!(result, Err(EnvelopeError::Timeout)) {
            warn!(
                timeout_ms = deadline.as_millis() as u64,
                state = ?self.reassembler.state(),
                "Receive deadline elapsed; discarding stream"
            );
            self.discard();
        }
        result
    }

    /// Reassembled envelope, once `Ready`
    pub fn envelope(&self) -> Result<&Envelope> {
        self.reassembler.envelope()
    }

    /// Mark the stream complete (peer boundary agreed out of band)
    pub fn finish(&mut self) -> Result<StreamState> {
        self.reassembler.finish()
    }

    pub fn state(&self) -> StreamState {
        self.reassembler.state()
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_open()
    }

    /// Send raw bytes without chunking
    pub async fn send_raw(&mut self, bytes: Bytes) -> Result<()> {
        let len = bytes.len() as u64;
        self.channel.send(bytes).await?;
        self.metrics.chunk_sent(len);
        Ok(())
    }

    /// Close the channel and drop any partial stream
    #[instrument(skip(self))]
    pub async fn close(&mut self) -> Result<()> {
        self.discard();
        self.channel.close().await
    }

    fn discard(&mut self) {
        if matches!(
            self.reassembler.state(),
            StreamState::HeaderPending | StreamState::Accumulating
        ) {
            self.metrics.stream_discarded();
        }
        self.reassembler.reset();
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
