//! Socket-to-player relay loop
//!
//! Moves one chunk at a time: read up to [`CHUNK_SIZE`] bytes, write exactly
//! those bytes, repeat. The next read never starts before the previous write
//! finished, which bounds memory to a single chunk and lets a slow player
//! push back on the socket.

use std::io;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::PcmFormat;
use crate::constants::{CHUNK_SIZE, WRITE_DRAIN_MS};
use crate::error::{Error, Result, StreamError};

/// Bound on finishing an in-flight write once cancellation is requested
pub const WRITE_DRAIN: Duration = Duration::from_millis(WRITE_DRAIN_MS);

/// Readable end of the relay
#[allow(async_fn_in_trait)]
pub trait ChunkSource {
    /// Read at most `buf.len()` bytes. `Ok(0)` means end-of-stream.
    async fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Writable end of the relay
#[allow(async_fn_in_trait)]
pub trait ChunkSink {
    /// Write all of `bytes` and flush before returning
    async fn write_chunk(&mut self, bytes: &[u8]) -> io::Result<()>;
}

/// Totals for one relay run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub bytes: u64,
    pub chunks: u64,
    pub elapsed: Duration,
}

impl RelayStats {
    /// Audio time relayed, assuming the stream is in `format`
    pub fn playback_duration(&self, format: &PcmFormat) -> Duration {
        format.duration_of(self.bytes)
    }
}

/// Relay until end-of-stream, an I/O error, or cancellation.
///
/// Cancellation is observed before each read and while blocked in either
/// the read or the write, and is reported as [`Error::Interrupted`]. A write
/// already in progress gets up to [`WRITE_DRAIN`] to complete before the
/// loop gives up on it.
pub async fn run<S, K>(source: &mut S, sink: &mut K, cancel: &CancellationToken) -> Result<RelayStats>
where
    S: ChunkSource,
    K: ChunkSink,
{
    let mut buf = [0u8; CHUNK_SIZE];
    let start = Instant::now();
    let mut stats = RelayStats::default();

    loop {
        if cancel.is_cancelled() {
            return Err(interrupted(&stats, start));
        }

        let n = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(interrupted(&stats, start)),
            read = source.read_chunk(&mut buf) => read.map_err(StreamError::Read)?,
        };

        if n == 0 {
            break;
        }

        let write = sink.write_chunk(&buf[..n]);
        tokio::pin!(write);

        tokio::select! {
            biased;
            written = &mut write => written.map_err(StreamError::Write)?,
            _ = cancel.cancelled() => {
                // the in-flight chunk may still finish or fail, within a bound
                match tokio::time::timeout(WRITE_DRAIN, &mut write).await {
                    Ok(Ok(())) => {
                        stats.bytes += n as u64;
                        stats.chunks += 1;
                    }
                    Ok(Err(e)) => debug!("In-flight write failed after interrupt: {}", e),
                    Err(_) => debug!("In-flight write still blocked after {:?}", WRITE_DRAIN),
                }
                return Err(interrupted(&stats, start));
            }
        }

        stats.bytes += n as u64;
        stats.chunks += 1;
        debug!("Relayed chunk {} ({} bytes, {} total)", stats.chunks, n, stats.bytes);
    }

    stats.elapsed = start.elapsed();
    info!(
        "End of stream after {} bytes in {} chunks ({:.1}s)",
        stats.bytes,
        stats.chunks,
        stats.elapsed.as_secs_f64()
    );
    Ok(stats)
}

fn interrupted(stats: &RelayStats, start: Instant) -> Error {
    info!(
        "Relay interrupted after {} bytes in {} chunks ({:.1}s)",
        stats.bytes,
        stats.chunks,
        start.elapsed().as_secs_f64()
    );
    Error::Interrupted
}
