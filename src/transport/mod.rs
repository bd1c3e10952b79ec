//! # Transport Layer
//!
//! Channels that carry envelope chunks between peers.
//!
//! A [`Channel`] is message-oriented, ordered and reliable: every `send` is
//! delivered to the peer as one `recv`, in order. The envelope layer adds no
//! sequence numbers of its own, so these guarantees are the channel's job.
//!
//! ## Implementations
//! - **Memory**: in-process pair backed by tokio mpsc queues
//! - **TCP**: tokio `TcpStream` framed by [`codec::ChunkCodec`]

pub mod codec;
pub mod memory;
pub mod tcp;

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;

pub use memory::MemoryChannel;
pub use tcp::TcpChannel;

/// Ordered, reliable, message-oriented link to one peer
#[async_trait]
pub trait Channel: Send {
    /// Deliver one chunk to the peer
    ///
    /// # Errors
    /// `EnvelopeError::Network` when the channel is not open or the peer is gone.
    async fn send(&mut self, chunk: Bytes) -> Result<()>;

    /// Next chunk from the peer; `None` once the peer has closed its side
    async fn recv(&mut self) -> Result<Option<Bytes>>;

    /// Close our side; the peer's `recv` drains and then yields `None`
    async fn close(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;
}
