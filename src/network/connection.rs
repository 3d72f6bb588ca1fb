//! Outbound TCP connection to the PCM source
//!
//! The stream carries no framing: bytes are handed out exactly as the
//! socket delivers them and the peer closing its side ends the stream.

use socket2::{SockRef, TcpKeepalive};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::config::NetworkConfig;
use crate::error::{Error, Result};
use crate::relay::ChunkSource;

/// Open connection handle
pub struct Connection {
    /// `None` once closed
    stream: Option<TcpStream>,
    /// Address as configured (`host:port`)
    address: String,
    /// Resolved peer
    peer: Option<SocketAddr>,
    /// Total bytes read so far
    bytes_read: u64,
}

impl Connection {
    /// Connect to the configured source. No timeout beyond the OS default.
    pub async fn connect(config: &NetworkConfig) -> Result<Self> {
        let address = config.address();
        info!("Connecting to PCM source at {}", address);

        let stream = TcpStream::connect((config.host.as_str(), config.port))
            .await
            .map_err(|source| Error::Connection {
                addr: address.clone(),
                source,
            })?;

        configure_socket(&stream, config).map_err(|source| Error::Connection {
            addr: address.clone(),
            source,
        })?;

        let peer = stream.peer_addr().ok();
        match peer {
            Some(peer) => info!("Connected to {} ({})", address, peer),
            None => info!("Connected to {}", address),
        }

        Ok(Self {
            stream: Some(stream),
            address,
            peer,
            bytes_read: 0,
        })
    }

    /// Read up to `buf.len()` bytes, blocking until data, EOF or error
    pub async fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection is closed"))?;

        let n = stream.read(buf).await?;
        self.bytes_read += n as u64;
        Ok(n)
    }

    /// Release the socket. Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            debug!("Closed connection to {} after {} bytes", self.address, self.bytes_read);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl ChunkSource for Connection {
    async fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Connection::read_chunk(self, buf).await
    }
}

fn configure_socket(stream: &TcpStream, config: &NetworkConfig) -> io::Result<()> {
    stream.set_nodelay(config.nodelay)?;

    if let Some(secs) = config.keepalive_secs {
        let keepalive = TcpKeepalive::new().with_time(Duration::from_secs(secs));
        SockRef::from(stream).set_tcp_keepalive(&keepalive)?;
        debug!("TCP keepalive set to {}s", secs);
    }

    Ok(())
}
