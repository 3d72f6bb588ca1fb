//! Error types for the PCM stream client

use std::io;
use thiserror::Error;

/// Main error type for the client
#[derive(Error, Debug)]
pub enum Error {
    #[error("Connection to {addr} failed: {source}")]
    Connection {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to start audio sink `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Interrupted by user")]
    Interrupted,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Mid-stream I/O failures, split by the side that failed
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("read from source failed: {0}")]
    Read(#[source] io::Error),

    #[error("write to sink failed: {0}")]
    Write(#[source] io::Error),
}

impl Error {
    /// True for a user-requested stop, which is not a failure
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Error::Interrupted)
    }

    /// Process exit status for this outcome
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Interrupted => 0,
            Error::Config(_) => 1,
            Error::Connection { .. } => 2,
            Error::Spawn { .. } => 3,
            Error::Stream(_) => 4,
        }
    }
}

impl StreamError {
    /// Underlying I/O error regardless of side
    pub fn io(&self) -> &io::Error {
        match self {
            StreamError::Read(e) | StreamError::Write(e) => e,
        }
    }
}

/// Result type alias for the client
pub type Result<T> = std::result::Result<T, Error>;
