//! In-process channel pair

use crate::error::{constants, EnvelopeError, Result};
use crate::transport::Channel;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, instrument};

/// One end of an in-process channel
///
/// Each direction is a bounded tokio mpsc queue, so sends apply
/// backpressure once `capacity` chunks are waiting.
#[derive(Debug)]
pub struct MemoryChannel {
    tx: Option<mpsc::Sender<Bytes>>,
    rx: mpsc::Receiver<Bytes>,
}

impl MemoryChannel {
    /// Create two connected ends
    pub fn pair(capacity: usize) -> (Self, Self) {
        let capacity = capacity.max(1);
        let (a_tx, b_rx) = mpsc::channel(capacity);
        let (b_tx, a_rx) = mpsc::channel(capacity);
        (
            Self {
                tx: Some(a_tx),
                rx: a_rx,
            },
            Self {
                tx: Some(b_tx),
                rx: b_rx,
            },
        )
    }
}

#[async_trait]
impl Channel for MemoryChannel {
    async fn send(&mut self, chunk: Bytes) -> Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| EnvelopeError::network(constants::ERR_CHANNEL_NOT_OPEN))?;
        tx.send(chunk)
            .await
            .map_err(|_| EnvelopeError::network(constants::ERR_PEER_GONE))
    }

    async fn recv(&mut self) -> Result<Option<Bytes>> {
        if self.tx.is_none() {
            return Ok(None);
        }
        Ok(self.rx.recv().await)
    }

    #[instrument(skip(self), level = "debug")]
    async fn close(&mut self) -> Result<()> {
        if self.tx.take().is_some() {
            self.rx.close();
            debug!("Memory channel closed");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.tx.is_some()
    }
}
