//! # PCM Stream Client
//!
//! Low-latency client that pulls a raw PCM stream off a TCP socket and
//! feeds it to a local audio player process.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────┐                           ┌──────────────────────┐
//! │   PCM SOURCE (TCP)   │      raw s16le stereo     │   PLAYER PROCESS     │
//! │   localhost:5016     │        48000 Hz           │   paplay --raw ...   │
//! └──────────┬───────────┘                           └──────────▲───────────┘
//!            │                                                  │ stdin pipe
//!            ▼                                                  │
//! ┌──────────────────────┐   ┌──────────────────────┐   ┌───────┴──────────────┐
//! │  Connection          │──▶│  Relay loop          │──▶│  SinkProcess         │
//! │  (network)           │   │  one 4096 byte chunk │   │  (sink)              │
//! │  read_chunk          │   │  in flight           │   │  write_chunk + flush │
//! └──────────────────────┘   └──────────▲───────────┘   └──────────────────────┘
//!                                       │
//!                            ┌──────────┴───────────┐
//!                            │  Session             │
//!                            │  open / relay /      │◀── CancellationToken (Ctrl-C)
//!                            │  shutdown            │
//!                            └──────────────────────┘
//! ```
//!
//! Every chunk is written to the player before the next one is read, so a
//! slow player stalls the socket instead of growing a buffer.

pub mod config;
pub mod error;
pub mod network;
pub mod relay;
pub mod session;
pub mod sink;

pub use config::ClientConfig;
pub use error::{Error, Result, StreamError};
pub use relay::RelayStats;
pub use session::{run, Session};

/// Application-wide constants
pub mod constants {
    /// Default PCM source host
    pub const DEFAULT_HOST: &str = "localhost";

    /// Default PCM source TCP port
    pub const DEFAULT_PORT: u16 = 5016;

    /// Maximum bytes moved per relay iteration
    pub const CHUNK_SIZE: usize = 4096;

    /// Default sample rate of the incoming stream
    pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

    /// Default channel count (stereo)
    pub const DEFAULT_CHANNELS: u16 = 2;

    /// Signed 16-bit little-endian samples
    pub const BYTES_PER_SAMPLE: usize = 2;

    /// How long an in-flight write may keep going after an interrupt
    pub const WRITE_DRAIN_MS: u64 = 500;

    /// How long the player gets to exit after SIGTERM before it is killed
    pub const DEFAULT_TERMINATE_GRACE_MS: u64 = 2000;
}
