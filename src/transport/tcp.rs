//! TCP channel with length-prefixed chunk frames

use crate::config::TransportConfig;
use crate::error::{constants, EnvelopeError, Result};
use crate::transport::codec::ChunkCodec;
use crate::transport::Channel;
use crate::utils::timeout::{with_timeout_error, DEFAULT_TIMEOUT};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;
use tracing::{debug, info, instrument};

pub struct TcpChannel {
    framed: Framed<TcpStream, ChunkCodec>,
    peer: SocketAddr,
    send_timeout: Duration,
    open: bool,
}

impl TcpChannel {
    /// Connect to `addr` with default timeouts and frame limit
    #[instrument(skip(addr), fields(address = %addr))]
    pub async fn connect(addr: &str) -> Result<Self> {
        let config = TransportConfig {
            address: addr.to_string(),
            ..TransportConfig::default()
        };
        Self::connect_with(&config).await
    }

    /// Connect using the address, timeouts and frame limit from `config`
    #[instrument(skip(config), fields(address = %config.address))]
    pub async fn connect_with(config: &TransportConfig) -> Result<Self> {
        let stream = with_timeout_error(
            async {
                TcpStream::connect(&config.address)
                    .await
                    .map_err(EnvelopeError::from)
            },
            config.connect_timeout,
        )
        .await?;
        let channel = Self::from_stream(stream, config)?;
        info!(peer = %channel.peer, "Connected");
        Ok(channel)
    }

    /// Accept the next inbound connection on `listener`
    pub async fn accept(listener: &TcpListener) -> Result<Self> {
        Self::accept_with(listener, &TransportConfig::default()).await
    }

    #[instrument(skip(listener, config))]
    pub async fn accept_with(listener: &TcpListener, config: &TransportConfig) -> Result<Self> {
        let (stream, _) = listener.accept().await?;
        let channel = Self::from_stream(stream, config)?;
        info!(peer = %channel.peer, "Accepted connection");
        Ok(channel)
    }

    fn from_stream(stream: TcpStream, config: &TransportConfig) -> Result<Self> {
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        Ok(Self {
            framed: Framed::new(stream, ChunkCodec::new(config.max_frame_size)),
            peer,
            send_timeout: config.send_timeout,
            open: true,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Override the per-chunk send timeout
    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }
}

impl std::fmt::Debug for TcpChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpChannel")
            .field("peer", &self.peer)
            .field("open", &self.open)
            .finish()
    }
}

#[async_trait]
impl Channel for TcpChannel {
    async fn send(&mut self, chunk: Bytes) -> Result<()> {
        if !self.open {
            return Err(EnvelopeError::network(constants::ERR_CHANNEL_NOT_OPEN));
        }
        let timeout = if self.send_timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.send_timeout
        };
        with_timeout_error(self.framed.send(chunk), timeout)
            .await
            .map_err(|e| match e {
                EnvelopeError::Io(io) => EnvelopeError::network(io.to_string()),
                EnvelopeError::Timeout => EnvelopeError::network(format!(
                    "{} after {}ms",
                    constants::ERR_SEND_TIMEOUT,
                    timeout.as_millis()
                )),
                EnvelopeError::OversizedChunk(len) => EnvelopeError::network(format!(
                    "{}: {len} bytes",
                    constants::ERR_FRAME_TOO_LARGE
                )),
                other => other,
            })
    }

    async fn recv(&mut self) -> Result<Option<Bytes>> {
        if !self.open {
            return Ok(None);
        }
        match self.framed.next().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(EnvelopeError::Io(e)))
                if e.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(peer = %self.peer, "Peer reset connection");
                Ok(None)
            }
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(peer = %self.peer))]
    async fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        // Flushes pending frames and shuts down the write half
        SinkExt::close(&mut self.framed).await?;
        debug!("TCP channel closed");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[tokio::test]
    async fn test_tcp_pair_exchanges_chunks() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let mut channel = TcpChannel::accept(&listener).await.unwrap();
            let mut received = Vec::new();
            while let Some(chunk) = channel.recv().await.unwrap() {
                received.push(chunk);
            }
            received
        });

        let mut client = TcpChannel::connect(&addr).await.unwrap();
        client.send(Bytes::from_static(b"alpha")).await.unwrap();
        client.send(Bytes::from_static(b"beta")).await.unwrap();
        client.close().await.unwrap();

        let received = server.await.unwrap();
        assert_eq!(received, vec![Bytes::from_static(b"alpha"), Bytes::from_static(b"beta")]);
    }

    #[tokio::test]
    async fn test_send_after_close_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let accept = tokio::spawn(async move { TcpChannel::accept(&listener).await });

        let mut client = TcpChannel::connect(&addr).await.unwrap();
        let _server = accept.await.unwrap().unwrap();
        client.close().await.unwrap();
        assert!(matches!(
            client.send(Bytes::from_static(b"late")).await,
            Err(EnvelopeError::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_oversized_chunk_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let accept = tokio::spawn(async move { TcpChannel::accept(&listener).await });

        let config = TransportConfig {
            address: addr,
            max_frame_size: 16,
            ..TransportConfig::default()
        };
        let mut client = TcpChannel::connect_with(&config).await.unwrap();
        let _server = accept.await.unwrap().unwrap();

        let err = client.send(Bytes::from(vec![0u8; 17])).await.unwrap_err();
        match err {
            EnvelopeError::Network(msg) => assert!(msg.contains("17 bytes")),
            other => panic!("expected network error, got {other:?}"),
        }
        client.send(Bytes::from(vec![0u8; 16])).await.unwrap();
    }
}
