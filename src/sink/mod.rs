//! Audio sink subsystem
//!
//! Playback is delegated to an external command-line player that reads raw
//! samples on stdin.

pub mod process;

pub use crate::config::{PcmFormat, Player};
pub use process::SinkProcess;
