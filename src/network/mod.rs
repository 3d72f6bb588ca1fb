//! Network subsystem for the TCP PCM source

pub mod connection;

pub use connection::Connection;
